//! Id-keyed operations over collection item trees.
//!
//! Every function here is pure: inputs are never mutated, rewriting
//! operations return a new forest and keep the ids of all untouched nodes.
//! Lookups are depth-first, pre-order.

use std::collections::HashSet;

use crate::models::{CollectionItem, ItemId};

/// All ids in the forest, depth-first pre-order.
pub fn collect_ids(items: &[CollectionItem]) -> Vec<ItemId> {
    let mut ids = Vec::new();
    collect_into(items, &mut ids);
    ids
}

fn collect_into(items: &[CollectionItem], ids: &mut Vec<ItemId>) {
    for item in items {
        ids.push(item.id().clone());
        collect_into(item.children(), ids);
    }
}

/// All ids in the forest as a set.
pub fn collect_id_set(items: &[CollectionItem]) -> HashSet<ItemId> {
    collect_ids(items).into_iter().collect()
}

/// First item with `id`, depth-first.
pub fn find_by_id<'a>(items: &'a [CollectionItem], id: &ItemId) -> Option<&'a CollectionItem> {
    items.iter().find_map(|item| {
        if item.id() == id {
            Some(item)
        } else {
            find_by_id(item.children(), id)
        }
    })
}

pub fn contains(items: &[CollectionItem], id: &ItemId) -> bool {
    find_by_id(items, id).is_some()
}

fn find_mut<'a>(items: &'a mut [CollectionItem], id: &ItemId) -> Option<&'a mut CollectionItem> {
    items.iter_mut().find_map(|item| {
        if item.id() == id {
            Some(item)
        } else {
            item.children_mut()
                .and_then(|children| find_mut(children, id))
        }
    })
}

/// Names from the root down to the item, the item's own name last.
///
/// Empty when `id` is not in the forest.
pub fn path_to(items: &[CollectionItem], id: &ItemId) -> Vec<String> {
    let mut trail = Vec::new();
    if path_into(items, id, &mut trail) {
        trail
    } else {
        Vec::new()
    }
}

fn path_into(items: &[CollectionItem], id: &ItemId, trail: &mut Vec<String>) -> bool {
    for item in items {
        trail.push(item.name().to_string());
        if item.id() == id || path_into(item.children(), id, trail) {
            return true;
        }
        trail.pop();
    }
    false
}

/// Id of the folder directly containing `id`; `None` at the root or when missing.
pub fn parent_id_of(items: &[CollectionItem], id: &ItemId) -> Option<ItemId> {
    for item in items {
        if item.children().iter().any(|child| child.id() == id) {
            return Some(item.id().clone());
        }
        if let Some(parent) = parent_id_of(item.children(), id) {
            return Some(parent);
        }
    }
    None
}

/// Append `new_item` to the folder `parent_id`, or to the root for `None`.
///
/// Returns `None` when `parent_id` does not name a folder.
pub fn try_insert_under(
    items: &[CollectionItem],
    parent_id: Option<&ItemId>,
    new_item: CollectionItem,
) -> Option<Vec<CollectionItem>> {
    let mut tree = items.to_vec();
    match parent_id {
        None => tree.push(new_item),
        Some(parent_id) => find_mut(&mut tree, parent_id)?
            .children_mut()?
            .push(new_item),
    }
    Some(tree)
}

/// Like [`try_insert_under`], returning an unchanged copy when the parent is not a folder.
pub fn insert_under(
    items: &[CollectionItem],
    parent_id: Option<&ItemId>,
    new_item: CollectionItem,
) -> Vec<CollectionItem> {
    try_insert_under(items, parent_id, new_item).unwrap_or_else(|| items.to_vec())
}

/// Insert `new_item` right after `sibling_id`, wherever that sibling lives.
///
/// An unknown sibling appends `new_item` at the root.
pub fn insert_after(
    items: &[CollectionItem],
    sibling_id: &ItemId,
    new_item: CollectionItem,
) -> Vec<CollectionItem> {
    let mut tree = items.to_vec();
    let mut pending = Some(new_item);
    insert_after_in(&mut tree, sibling_id, &mut pending);
    if let Some(item) = pending {
        tree.push(item);
    }
    tree
}

fn insert_after_in(
    items: &mut Vec<CollectionItem>,
    sibling_id: &ItemId,
    pending: &mut Option<CollectionItem>,
) {
    if let Some(index) = items.iter().position(|item| item.id() == sibling_id) {
        if let Some(item) = pending.take() {
            items.insert(index + 1, item);
        }
        return;
    }
    for item in items.iter_mut() {
        if pending.is_none() {
            return;
        }
        if let Some(children) = item.children_mut() {
            insert_after_in(children, sibling_id, pending);
        }
    }
}

/// Append `new_item` inside the folder reached by following folder names.
///
/// Returns `None` when a segment has no matching folder. With two sibling
/// folders of the same name the first one wins.
pub fn try_insert_at_path(
    items: &[CollectionItem],
    name_path: &[String],
    new_item: CollectionItem,
) -> Option<Vec<CollectionItem>> {
    let mut tree = items.to_vec();
    let mut level = &mut tree;
    for segment in name_path {
        level = level
            .iter_mut()
            .find(|item| item.is_folder() && item.name() == segment.as_str())?
            .children_mut()?;
    }
    level.push(new_item);
    Some(tree)
}

/// Like [`try_insert_at_path`], returning an unchanged copy when the path is missing.
pub fn insert_at_path(
    items: &[CollectionItem],
    name_path: &[String],
    new_item: CollectionItem,
) -> Vec<CollectionItem> {
    try_insert_at_path(items, name_path, new_item).unwrap_or_else(|| items.to_vec())
}

/// Replace the node with `id` (children included) by `new_item`.
pub fn replace(items: &[CollectionItem], id: &ItemId, new_item: CollectionItem) -> Vec<CollectionItem> {
    let mut tree = items.to_vec();
    if let Some(slot) = find_mut(&mut tree, id) {
        *slot = new_item;
    }
    tree
}

/// Replace the own fields of the node with `id`, keeping its current children.
///
/// When `new_item` is not a folder the children move to just after it so
/// that no descendant is dropped.
pub fn replace_fields(
    items: &[CollectionItem],
    id: &ItemId,
    new_item: &CollectionItem,
) -> Vec<CollectionItem> {
    let Some(current) = find_by_id(items, id) else {
        return items.to_vec();
    };
    let children = current.children().to_vec();
    if new_item.is_folder() || children.is_empty() {
        return replace(items, id, new_item.without_children().with_children(children));
    }

    let mut tree = replace(items, id, new_item.clone());
    let mut anchor = id.clone();
    for child in children {
        let next_anchor = child.id().clone();
        tree = insert_after(&tree, &anchor, child);
        anchor = next_anchor;
    }
    tree
}

/// Remove the node with `id` and its whole subtree.
pub fn remove(items: &[CollectionItem], id: &ItemId) -> Vec<CollectionItem> {
    let mut tree = items.to_vec();
    remove_in(&mut tree, id);
    tree
}

fn remove_in(items: &mut Vec<CollectionItem>, id: &ItemId) -> bool {
    if let Some(index) = items.iter().position(|item| item.id() == id) {
        items.remove(index);
        return true;
    }
    items
        .iter_mut()
        .any(|item| item.children_mut().is_some_and(|children| remove_in(children, id)))
}

/// Remove every node in `ids`, moving children that are not removed
/// themselves into the removed node's position.
pub fn remove_splicing(items: &[CollectionItem], ids: &HashSet<ItemId>) -> Vec<CollectionItem> {
    let mut tree = Vec::with_capacity(items.len());
    for item in items {
        let children = remove_splicing(item.children(), ids);
        if ids.contains(item.id()) {
            tree.extend(children);
        } else {
            tree.push(item.without_children().with_children(children));
        }
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(id: &str, name: &str) -> CollectionItem {
        let mut item = CollectionItem::request(name, format!("https://example.com/{id}"));
        item.set_id(ItemId::from(id));
        item
    }

    fn folder(id: &str, name: &str, items: Vec<CollectionItem>) -> CollectionItem {
        let mut item = CollectionItem::folder(name, items);
        item.set_id(ItemId::from(id));
        item
    }

    /// users/ [list, admin/ [ban]], ping
    fn sample() -> Vec<CollectionItem> {
        vec![
            folder(
                "users",
                "Users",
                vec![
                    request("list", "List"),
                    folder("admin", "Admin", vec![request("ban", "Ban")]),
                ],
            ),
            request("ping", "Ping"),
        ]
    }

    fn ids(items: &[CollectionItem]) -> Vec<String> {
        collect_ids(items)
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_collect_ids_is_preorder() {
        assert_eq!(ids(&sample()), vec!["users", "list", "admin", "ban", "ping"]);
    }

    #[test]
    fn test_find_by_id_searches_nested_folders() {
        let tree = sample();
        assert_eq!(find_by_id(&tree, &"ban".into()).map(CollectionItem::name), Some("Ban"));
        assert!(find_by_id(&tree, &"missing".into()).is_none());
    }

    #[test]
    fn test_path_to_includes_target_name() {
        let tree = sample();
        assert_eq!(path_to(&tree, &"ban".into()), vec!["Users", "Admin", "Ban"]);
        assert_eq!(path_to(&tree, &"ping".into()), vec!["Ping"]);
        assert!(path_to(&tree, &"missing".into()).is_empty());
    }

    #[test]
    fn test_parent_id_of_nested_and_root_items() {
        let tree = sample();
        assert_eq!(parent_id_of(&tree, &"ban".into()), Some(ItemId::from("admin")));
        assert_eq!(parent_id_of(&tree, &"list".into()), Some(ItemId::from("users")));
        assert_eq!(parent_id_of(&tree, &"ping".into()), None);
        assert_eq!(parent_id_of(&tree, &"missing".into()), None);
    }

    #[test]
    fn test_insert_under_appends_to_folder_or_root() {
        let tree = sample();

        let nested = insert_under(&tree, Some(&"admin".into()), request("kick", "Kick"));
        assert_eq!(parent_id_of(&nested, &"kick".into()), Some(ItemId::from("admin")));

        let root = insert_under(&tree, None, request("kick", "Kick"));
        assert_eq!(ids(&root).last().map(String::as_str), Some("kick"));
        assert_eq!(parent_id_of(&root, &"kick".into()), None);
    }

    #[test]
    fn test_insert_under_leaf_or_missing_parent_is_noop() {
        let tree = sample();
        assert_eq!(insert_under(&tree, Some(&"ping".into()), request("x", "X")), tree);
        assert_eq!(insert_under(&tree, Some(&"missing".into()), request("x", "X")), tree);
        assert!(try_insert_under(&tree, Some(&"ping".into()), request("x", "X")).is_none());
    }

    #[test]
    fn test_insert_after_places_item_next_to_nested_sibling() {
        let tree = sample();
        let updated = insert_after(&tree, &"list".into(), request("create", "Create"));
        assert_eq!(
            ids(&updated),
            vec!["users", "list", "create", "admin", "ban", "ping"]
        );
    }

    #[test]
    fn test_insert_after_unknown_sibling_appends_at_root() {
        let tree = sample();
        let updated = insert_after(&tree, &"missing".into(), request("create", "Create"));
        assert_eq!(
            ids(&updated),
            vec!["users", "list", "admin", "ban", "ping", "create"]
        );
    }

    #[test]
    fn test_insert_at_path_follows_folder_names() {
        let tree = sample();
        let path = vec!["Users".to_string(), "Admin".to_string()];
        let updated = insert_at_path(&tree, &path, request("kick", "Kick"));
        assert_eq!(parent_id_of(&updated, &"kick".into()), Some(ItemId::from("admin")));

        let root = insert_at_path(&tree, &[], request("kick", "Kick"));
        assert_eq!(parent_id_of(&root, &"kick".into()), None);
        assert!(contains(&root, &"kick".into()));
    }

    #[test]
    fn test_insert_at_path_missing_segment_is_noop() {
        let tree = sample();
        let path = vec!["Users".to_string(), "Billing".to_string()];
        assert_eq!(insert_at_path(&tree, &path, request("kick", "Kick")), tree);

        // Leaf names never match a path segment.
        let through_leaf = vec!["Ping".to_string()];
        assert!(try_insert_at_path(&tree, &through_leaf, request("kick", "Kick")).is_none());
    }

    #[test]
    fn test_replace_and_remove_leave_input_untouched() {
        let tree = sample();
        let snapshot = tree.clone();

        let replaced = replace(&tree, &"ban".into(), request("ban", "Ban Forever"));
        assert_eq!(find_by_id(&replaced, &"ban".into()).map(CollectionItem::name), Some("Ban Forever"));

        let removed = remove(&tree, &"admin".into());
        assert_eq!(ids(&removed), vec!["users", "list", "ping"]);

        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_replace_fields_keeps_folder_children() {
        let tree = sample();
        let renamed = folder("admin", "Moderation", Vec::new());
        let updated = replace_fields(&tree, &"admin".into(), &renamed);
        assert_eq!(path_to(&updated, &"ban".into()), vec!["Users", "Moderation", "Ban"]);
    }

    #[test]
    fn test_replace_fields_with_leaf_moves_children_after_it() {
        let tree = sample();
        let updated = replace_fields(&tree, &"admin".into(), &request("admin", "Admin Request"));
        assert_eq!(ids(&updated), vec!["users", "list", "admin", "ban", "ping"]);
        assert_eq!(parent_id_of(&updated, &"ban".into()), Some(ItemId::from("users")));
        assert!(!find_by_id(&updated, &"admin".into()).is_some_and(CollectionItem::is_folder));
    }

    #[test]
    fn test_remove_splicing_keeps_surviving_descendants() {
        let tree = sample();
        let doomed: HashSet<ItemId> = [ItemId::from("users"), ItemId::from("list")].into_iter().collect();
        let updated = remove_splicing(&tree, &doomed);
        assert_eq!(ids(&updated), vec!["admin", "ban", "ping"]);
        assert_eq!(parent_id_of(&updated, &"ban".into()), Some(ItemId::from("admin")));
    }
}
