use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// Screen models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::screens)]
pub struct Screen {
    pub id: i32,
    pub business_id: i32,
    pub name: String,
    pub public_slug: String,
    #[serde(skip_serializing)]
    pub public_token: String,
    pub broadcast_code: Option<String>,
    pub is_active: bool,
    pub background_color: String,
    pub published_version: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::screens)]
pub struct NewScreen {
    pub business_id: i32,
    pub name: String,
    pub public_slug: String,
    pub public_token: String,
    pub background_color: String,
}

// Rotation models
//
// One row per slot in a screen's display cycle. Exactly one of template_id
// (block-based template) or canvas_template_id (free-form editor template)
// is set; the active subset ordered by display_order is the rotation.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::screen_template_rotations)]
pub struct RotationEntry {
    pub id: i32,
    pub screen_id: i32,
    pub template_id: Option<i32>,
    pub canvas_template_id: Option<i32>,
    pub display_order: i32,
    pub display_duration: i32,
    pub transition_effect: String,
    pub transition_duration: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RotationEntry {
    /// Namespaced reference to the content source this entry renders.
    /// Canvas templates win when both columns are somehow populated.
    pub fn content_ref(&self) -> Option<String> {
        self.canvas_template_id
            .map(|id| format!("c{}", id))
            .or_else(|| self.template_id.map(|id| format!("t{}", id)))
    }
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::screen_template_rotations)]
pub struct NewRotationEntry {
    pub screen_id: i32,
    pub template_id: Option<i32>,
    pub canvas_template_id: Option<i32>,
    pub display_order: i32,
    pub display_duration: i32,
    pub transition_effect: String,
    pub transition_duration: i32,
    pub is_active: bool,
}

// Menu models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::menus)]
pub struct Menu {
    pub id: i32,
    pub business_id: i32,
    pub name: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::menus)]
pub struct NewMenu {
    pub business_id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::menu_items)]
pub struct MenuItem {
    pub id: i32,
    pub menu_id: i32,
    pub name: String,
    pub price: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::menu_items)]
pub struct NewMenuItem {
    pub menu_id: i32,
    pub name: String,
    pub price: Option<String>,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::screen_menu)]
pub struct NewScreenMenu {
    pub screen_id: i32,
    pub menu_id: i32,
    pub display_order: i32,
}

// Template models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::templates)]
pub struct Template {
    pub id: i32,
    pub display_name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::templates)]
pub struct NewTemplate {
    pub display_name: String,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::template_blocks)]
pub struct NewTemplateBlock {
    pub template_id: i32,
    pub block_index: i32,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::template_block_contents)]
pub struct NewTemplateBlockContent {
    pub template_block_id: i32,
    pub content_type: String,
    pub menu_item_id: Option<i32>,
    pub menu_id: Option<i32>,
    pub is_active: bool,
}

// Screen-local block overrides
#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::screen_blocks)]
pub struct NewScreenBlock {
    pub screen_id: i32,
    pub template_block_id: Option<i32>,
    pub display_order: i32,
    pub is_active: bool,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::screen_block_contents)]
pub struct NewScreenBlockContent {
    pub screen_block_id: i32,
    pub content_type: String,
    pub menu_item_id: Option<i32>,
    pub menu_id: Option<i32>,
    pub is_active: bool,
}
