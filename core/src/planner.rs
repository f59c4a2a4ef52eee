//! Week-indexed meal planner.
//!
//! Weeks are keyed by their Saturday start date; day 0 is that Saturday and
//! day 6 the following Friday.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DAYS_PER_WEEK: u8 = 7;

const DAY_NAMES: &[&str] = &[
    "Saturday",
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
];

/// The Saturday on or before `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = (date.weekday().num_days_from_monday() + 2) % 7;
    date - Duration::days(i64::from(offset))
}

/// Split a calendar date into its week start and day index.
#[must_use]
pub fn locate(date: NaiveDate) -> (NaiveDate, u8) {
    let start = week_start(date);
    #[allow(clippy::cast_sign_loss)]
    let day = (date - start).num_days() as u8;
    (start, day)
}

#[must_use]
pub fn day_name(day: u8) -> &'static str {
    DAY_NAMES[usize::from(day % DAYS_PER_WEEK)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 3] = [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealSlot::Breakfast),
            "lunch" => Ok(MealSlot::Lunch),
            "dinner" => Ok(MealSlot::Dinner),
            _ => bail!("Invalid meal slot '{s}'. Must be one of: breakfast, lunch, dinner"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlannedMeal {
    Recipe {
        id: i64,
    },
    Simple {
        name: String,
        #[serde(default)]
        products: Vec<i64>,
    },
}

impl PlannedMeal {
    #[must_use]
    pub fn recipe_id(&self) -> Option<i64> {
        match self {
            PlannedMeal::Recipe { id } => Some(*id),
            PlannedMeal::Simple { .. } => None,
        }
    }

    #[must_use]
    pub fn simple_products(&self) -> &[i64] {
        match self {
            PlannedMeal::Recipe { .. } => &[],
            PlannedMeal::Simple { products, .. } => products,
        }
    }
}

pub type DayPlan = BTreeMap<MealSlot, PlannedMeal>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MealPlan {
    weeks: BTreeMap<NaiveDate, BTreeMap<u8, DayPlan>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub day: u8,
    pub date: NaiveDate,
    pub weekday: &'static str,
    pub breakfast: Option<PlannedMeal>,
    pub lunch: Option<PlannedMeal>,
    pub dinner: Option<PlannedMeal>,
}

impl DayView {
    #[must_use]
    pub fn slot(&self, slot: MealSlot) -> Option<&PlannedMeal> {
        match slot {
            MealSlot::Breakfast => self.breakfast.as_ref(),
            MealSlot::Lunch => self.lunch.as_ref(),
            MealSlot::Dinner => self.dinner.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekView {
    pub week_start: NaiveDate,
    pub days: Vec<DayView>,
}

pub fn check_meal_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("A simple meal needs a name");
    }
    Ok(())
}

fn check_week(week: NaiveDate) -> Result<()> {
    if week_start(week) != week {
        bail!(
            "{week} is a {}, not a week start (weeks start on Saturday, e.g. {})",
            week.format("%A"),
            week_start(week)
        );
    }
    Ok(())
}

fn check_day(day: u8) -> Result<()> {
    if day >= DAYS_PER_WEEK {
        bail!("Day index must be between 0 and 6 (got {day})");
    }
    Ok(())
}

impl MealPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    /// Number of filled slots across all weeks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weeks
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    #[must_use]
    pub fn weeks(&self) -> Vec<NaiveDate> {
        self.weeks.keys().copied().collect()
    }

    fn meals(&self) -> impl Iterator<Item = &PlannedMeal> {
        self.weeks
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
    }

    /// Meals planned for one week, in day then slot order.
    #[must_use]
    pub fn meals_in_week(&self, week: NaiveDate) -> Vec<&PlannedMeal> {
        self.weeks
            .get(&week)
            .map(|days| days.values().flat_map(BTreeMap::values).collect())
            .unwrap_or_default()
    }

    /// Fill a slot, returning whatever it held before.
    pub fn assign(
        &mut self,
        week: NaiveDate,
        day: u8,
        slot: MealSlot,
        meal: PlannedMeal,
    ) -> Result<Option<PlannedMeal>> {
        check_week(week)?;
        check_day(day)?;
        if let PlannedMeal::Simple { name, .. } = &meal {
            check_meal_name(name)?;
        }
        Ok(self
            .weeks
            .entry(week)
            .or_default()
            .entry(day)
            .or_default()
            .insert(slot, meal))
    }

    pub fn assign_on(
        &mut self,
        date: NaiveDate,
        slot: MealSlot,
        meal: PlannedMeal,
    ) -> Result<Option<PlannedMeal>> {
        let (week, day) = locate(date);
        self.assign(week, day, slot, meal)
    }

    #[must_use]
    pub fn get(&self, week: NaiveDate, day: u8, slot: MealSlot) -> Option<&PlannedMeal> {
        self.weeks.get(&week)?.get(&day)?.get(&slot)
    }

    pub fn clear(&mut self, week: NaiveDate, day: u8, slot: MealSlot) -> Option<PlannedMeal> {
        let days = self.weeks.get_mut(&week)?;
        let slots = days.get_mut(&day)?;
        let removed = slots.remove(&slot);
        self.prune();
        removed
    }

    pub fn clear_on(&mut self, date: NaiveDate, slot: MealSlot) -> Option<PlannedMeal> {
        let (week, day) = locate(date);
        self.clear(week, day, slot)
    }

    pub fn clear_week(&mut self, week: NaiveDate) -> usize {
        self.weeks
            .remove(&week)
            .map_or(0, |days| days.values().map(BTreeMap::len).sum())
    }

    /// Replace week `to` with a copy of week `from`.
    pub fn copy_week(&mut self, from: NaiveDate, to: NaiveDate) -> Result<usize> {
        check_week(from)?;
        check_week(to)?;
        if from == to {
            bail!("Source and destination week are the same");
        }
        let Some(days) = self.weeks.get(&from).cloned() else {
            bail!("Nothing planned for the week of {from}");
        };
        let copied = days.values().map(BTreeMap::len).sum();
        self.weeks.insert(to, days);
        Ok(copied)
    }

    pub fn week(&self, week: NaiveDate) -> Result<WeekView> {
        check_week(week)?;
        let planned = self.weeks.get(&week);
        let mut days = Vec::with_capacity(usize::from(DAYS_PER_WEEK));
        for day in 0..DAYS_PER_WEEK {
            let date = week
                .checked_add_signed(Duration::days(i64::from(day)))
                .with_context(|| format!("The week of {week} runs past the last supported date"))?;
            let slots = planned.and_then(|d| d.get(&day));
            let pick = |slot: MealSlot| slots.and_then(|s| s.get(&slot)).cloned();
            days.push(DayView {
                day,
                date,
                weekday: day_name(day),
                breakfast: pick(MealSlot::Breakfast),
                lunch: pick(MealSlot::Lunch),
                dinner: pick(MealSlot::Dinner),
            });
        }
        Ok(WeekView {
            week_start: week,
            days,
        })
    }

    #[must_use]
    pub fn references_recipe(&self, recipe_id: i64) -> bool {
        self.meals().any(|m| m.recipe_id() == Some(recipe_id))
    }

    #[must_use]
    pub fn references_product(&self, product_id: i64) -> bool {
        self.meals()
            .any(|m| m.simple_products().contains(&product_id))
    }

    /// Clear every slot that points at `recipe_id`.
    pub fn remove_recipe(&mut self, recipe_id: i64) -> usize {
        let mut removed = 0;
        for days in self.weeks.values_mut() {
            for slots in days.values_mut() {
                let before = slots.len();
                slots.retain(|_, meal| meal.recipe_id() != Some(recipe_id));
                removed += before - slots.len();
            }
        }
        self.prune();
        removed
    }

    /// Drop dangling recipe slots and simple-meal products; returns how many.
    pub fn retain_references<P, R>(&mut self, product_exists: P, recipe_exists: R) -> usize
    where
        P: Fn(i64) -> bool,
        R: Fn(i64) -> bool,
    {
        let mut dropped = 0;
        for days in self.weeks.values_mut() {
            for slots in days.values_mut() {
                slots.retain(|_, meal| match meal {
                    PlannedMeal::Recipe { id } => {
                        let keep = recipe_exists(*id);
                        if !keep {
                            dropped += 1;
                        }
                        keep
                    }
                    PlannedMeal::Simple { products, .. } => {
                        let before = products.len();
                        products.retain(|p| product_exists(*p));
                        dropped += before - products.len();
                        true
                    }
                });
            }
        }
        self.prune();
        dropped
    }

    /// Remove empty days and weeks.
    fn prune(&mut self) {
        for days in self.weeks.values_mut() {
            days.retain(|_, slots| !slots.is_empty());
        }
        self.weeks.retain(|_, days| !days.is_empty());
    }

    /// Validate keys after deserialising a plan from storage or a file.
    pub fn validate(&self) -> Result<()> {
        for (week, days) in &self.weeks {
            check_week(*week)?;
            for (day, slots) in days {
                check_day(*day)?;
                for meal in slots.values() {
                    if let PlannedMeal::Simple { name, .. } = meal {
                        if name.trim().is_empty() {
                            bail!("Simple meal in the week of {week} has no name");
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
