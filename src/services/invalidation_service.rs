use anyhow::Result;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::collections::BTreeSet;

/// A content mutation the pipeline may need to react to. The admin CRUD
/// reports these after commit; the resolver decides which screens' published
/// artifacts could now be stale.
#[derive(Debug, Clone, Copy)]
pub enum ContentChange {
    MenuItem { menu_item_id: i32, menu_id: i32 },
    Menu { menu_id: i32 },
    Template { template_id: i32 },
}

/// Screens whose published artifacts depend on the changed entity, each
/// exactly once. The traversal paths are independent queries unioned at the
/// end, because a screen can reach the same menu item through a menu
/// assignment, a shared template block, and a screen-local override at the
/// same time.
pub fn affected_screens(
    conn: &mut SqliteConnection,
    change: &ContentChange,
) -> Result<BTreeSet<i32>> {
    match change {
        ContentChange::MenuItem {
            menu_item_id,
            menu_id,
        } => {
            let items = vec![*menu_item_id];
            let mut affected = screens_assigned_to_menu(conn, *menu_id)?;
            affected.extend(screens_via_template_blocks(conn, &items, *menu_id)?);
            affected.extend(screens_via_screen_blocks(conn, &items, *menu_id)?);
            Ok(affected)
        }
        ContentChange::Menu { menu_id } => {
            let items = item_ids_of_menu(conn, *menu_id)?;
            let mut affected = screens_assigned_to_menu(conn, *menu_id)?;
            affected.extend(screens_via_template_blocks(conn, &items, *menu_id)?);
            affected.extend(screens_via_screen_blocks(conn, &items, *menu_id)?);
            Ok(affected)
        }
        ContentChange::Template { template_id } => screens_rotating_template(conn, *template_id),
    }
}

/// Screens directly linked to the menu through a screen-menu assignment.
pub fn screens_assigned_to_menu(
    conn: &mut SqliteConnection,
    target_menu_id: i32,
) -> Result<BTreeSet<i32>> {
    use crate::schema::screen_menu::dsl::*;

    let ids = screen_menu
        .filter(menu_id.eq(target_menu_id))
        .select(screen_id)
        .load::<i32>(conn)?;
    Ok(ids.into_iter().collect())
}

/// Screens whose active rotation uses a shared template containing an active
/// block-content row for one of the items, or a product list of the menu.
pub fn screens_via_template_blocks(
    conn: &mut SqliteConnection,
    items: &[i32],
    target_menu_id: i32,
) -> Result<BTreeSet<i32>> {
    use crate::schema::template_block_contents::dsl as tbc;
    use crate::schema::template_blocks::dsl as tb;

    let block_ids = tbc::template_block_contents
        .filter(tbc::is_active.eq(true))
        .filter(
            tbc::menu_item_id.eq_any(items).or(tbc::content_type
                .eq("product_list")
                .and(tbc::menu_id.eq(target_menu_id))),
        )
        .select(tbc::template_block_id)
        .load::<i32>(conn)?;
    if block_ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let template_ids = tb::template_blocks
        .filter(tb::id.eq_any(block_ids))
        .select(tb::template_id)
        .distinct()
        .load::<i32>(conn)?;

    screens_rotating_block_templates(conn, &template_ids)
}

/// Screens with an active screen-local block override referencing one of the
/// items or a product list of the menu.
pub fn screens_via_screen_blocks(
    conn: &mut SqliteConnection,
    items: &[i32],
    target_menu_id: i32,
) -> Result<BTreeSet<i32>> {
    use crate::schema::screen_block_contents::dsl as sbc;
    use crate::schema::screen_blocks::dsl as sb;

    let block_ids = sbc::screen_block_contents
        .filter(sbc::is_active.eq(true))
        .filter(
            sbc::menu_item_id.eq_any(items).or(sbc::content_type
                .eq("product_list")
                .and(sbc::menu_id.eq(target_menu_id))),
        )
        .select(sbc::screen_block_id)
        .load::<i32>(conn)?;
    if block_ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let ids = sb::screen_blocks
        .filter(sb::id.eq_any(block_ids))
        .filter(sb::is_active.eq(true))
        .select(sb::screen_id)
        .load::<i32>(conn)?;
    Ok(ids.into_iter().collect())
}

/// Screens whose active rotation carries the template directly (block-based
/// or canvas).
fn screens_rotating_template(
    conn: &mut SqliteConnection,
    target_template_id: i32,
) -> Result<BTreeSet<i32>> {
    use crate::schema::screen_template_rotations::dsl::*;

    let ids = screen_template_rotations
        .filter(is_active.eq(true))
        .filter(
            template_id
                .eq(target_template_id)
                .or(canvas_template_id.eq(target_template_id)),
        )
        .select(screen_id)
        .load::<i32>(conn)?;
    Ok(ids.into_iter().collect())
}

fn screens_rotating_block_templates(
    conn: &mut SqliteConnection,
    template_ids: &[i32],
) -> Result<BTreeSet<i32>> {
    use crate::schema::screen_template_rotations::dsl as rot;

    if template_ids.is_empty() {
        return Ok(BTreeSet::new());
    }
    let ids = rot::screen_template_rotations
        .filter(rot::is_active.eq(true))
        .filter(rot::template_id.eq_any(template_ids))
        .select(rot::screen_id)
        .load::<i32>(conn)?;
    Ok(ids.into_iter().collect())
}

fn item_ids_of_menu(conn: &mut SqliteConnection, target_menu_id: i32) -> Result<Vec<i32>> {
    use crate::schema::menu_items::dsl::*;

    Ok(menu_items
        .filter(menu_id.eq(target_menu_id))
        .select(id)
        .load::<i32>(conn)?)
}
