mod data;
mod helpers;
mod pantry;
mod plan;
mod product;
mod recipe;
mod shop;

pub(crate) use data::{cmd_doctor, cmd_export, cmd_import, cmd_init};
pub(crate) use pantry::{
    cmd_pantry_add, cmd_pantry_list, cmd_pantry_remove, cmd_pantry_restock, cmd_pantry_toggle,
};
pub(crate) use plan::{
    MealChoice, cmd_plan_clear, cmd_plan_copy, cmd_plan_set, cmd_plan_shop, cmd_plan_show,
};
pub(crate) use product::{
    cmd_category_add, cmd_category_delete, cmd_category_list, cmd_category_move,
    cmd_product_delete, cmd_product_list, cmd_product_move, cmd_product_rename,
    cmd_product_season,
};
pub(crate) use recipe::{
    cmd_recipe_add_ingredient, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_import,
    cmd_recipe_list, cmd_recipe_remove_ingredient, cmd_recipe_show, cmd_recipe_shop,
};
pub(crate) use shop::{
    cmd_shop_add, cmd_shop_check, cmd_shop_clear, cmd_shop_csv, cmd_shop_list, cmd_shop_remove,
    cmd_shop_stocked,
};
