mod helpers;
mod import;
mod ingredient;
mod list;
mod meal;
mod pantry;
mod profile;

pub(crate) use import::cmd_import_ingredients;
pub(crate) use ingredient::{
    cmd_ingredient_add, cmd_ingredient_delete, cmd_ingredient_edit, cmd_ingredient_list,
};
pub(crate) use list::{
    cmd_list_add, cmd_list_clear, cmd_list_email, cmd_list_select, cmd_list_show,
};
pub(crate) use meal::{
    cmd_meal_create, cmd_meal_delete, cmd_meal_edit, cmd_meal_list, cmd_meal_show,
};
pub(crate) use pantry::{cmd_pantry_add, cmd_pantry_list, cmd_pantry_pick, cmd_pantry_remove};
pub(crate) use profile::{cmd_profile_set, cmd_profile_show};
