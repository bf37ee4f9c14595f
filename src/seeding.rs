use crate::db::DbPool;
use crate::models::{
    NewMenu, NewMenuItem, NewRotationEntry, NewScreen, NewScreenMenu, NewTemplate,
    NewTemplateBlock, NewTemplateBlockContent,
};
use anyhow::Result;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

const DEMO_ITEMS: &[(&str, &str)] = &[
    ("Margherita", "12.50"),
    ("Quattro Stagioni", "15.00"),
    ("Tiramisu", "7.50"),
];

/// Seed a demo screen with a published rotation on a fresh database, so a
/// first `POST /api/screens/1/regenerate` has something to render.
pub fn seed_defaults(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;

    let existing: i64 = {
        use crate::schema::screens::dsl::*;
        screens.count().get_result(&mut conn)?
    };
    if existing > 0 {
        return Ok(());
    }

    tracing::info!("Seeding demo screen and menu...");
    seed_demo_screen(&mut conn)
}

fn seed_demo_screen(conn: &mut SqliteConnection) -> Result<()> {
    use crate::schema::{
        menu_items, menus, screen_menu, screen_template_rotations, screens,
        template_block_contents, template_blocks, templates,
    };

    let menu_id: i32 = diesel::insert_into(menus::table)
        .values(&NewMenu {
            business_id: 1,
            name: "Demo Menu".to_string(),
        })
        .returning(menus::id)
        .get_result(conn)?;

    let mut first_item_id = None;
    for (name, price) in DEMO_ITEMS {
        let item_id: i32 = diesel::insert_into(menu_items::table)
            .values(&NewMenuItem {
                menu_id,
                name: name.to_string(),
                price: Some(price.to_string()),
            })
            .returning(menu_items::id)
            .get_result(conn)?;
        first_item_id.get_or_insert(item_id);
    }

    // A two-block template: one hero product, one full menu listing.
    let template_id: i32 = diesel::insert_into(templates::table)
        .values(&NewTemplate {
            display_name: "Demo Two Block".to_string(),
        })
        .returning(templates::id)
        .get_result(conn)?;
    let hero_block: i32 = diesel::insert_into(template_blocks::table)
        .values(&NewTemplateBlock {
            template_id,
            block_index: 0,
        })
        .returning(template_blocks::id)
        .get_result(conn)?;
    diesel::insert_into(template_block_contents::table)
        .values(&NewTemplateBlockContent {
            template_block_id: hero_block,
            content_type: "single_product".to_string(),
            menu_item_id: first_item_id,
            menu_id: None,
            is_active: true,
        })
        .execute(conn)?;
    let list_block: i32 = diesel::insert_into(template_blocks::table)
        .values(&NewTemplateBlock {
            template_id,
            block_index: 1,
        })
        .returning(template_blocks::id)
        .get_result(conn)?;
    diesel::insert_into(template_block_contents::table)
        .values(&NewTemplateBlockContent {
            template_block_id: list_block,
            content_type: "product_list".to_string(),
            menu_item_id: None,
            menu_id: Some(menu_id),
            is_active: true,
        })
        .execute(conn)?;

    let screen_id: i32 = diesel::insert_into(screens::table)
        .values(&NewScreen {
            business_id: 1,
            name: "TV1".to_string(),
            public_slug: "demo-tv1".to_string(),
            public_token: uuid::Uuid::new_v4().simple().to_string(),
            background_color: "#000000".to_string(),
        })
        .returning(screens::id)
        .get_result(conn)?;
    diesel::insert_into(screen_menu::table)
        .values(&NewScreenMenu {
            screen_id,
            menu_id,
            display_order: 0,
        })
        .execute(conn)?;
    diesel::insert_into(screen_template_rotations::table)
        .values(&NewRotationEntry {
            screen_id,
            template_id: Some(template_id),
            canvas_template_id: None,
            display_order: 0,
            display_duration: 8,
            transition_effect: "slide-left".to_string(),
            transition_duration: 500,
            is_active: true,
        })
        .execute(conn)?;

    tracing::info!("Seeded demo screen {} (slug demo-tv1)", screen_id);
    Ok(())
}
