mod support;

use std::sync::{Arc, Mutex};

use pageable::{
    topics, CollectionError, ModificationChange, ModificationLog, PageableCollection, Selection,
    SelectionHandling,
};
use support::rows::{Row, RowService};
use support::{letters, names, people, Person};

#[test]
fn join_preserves_added_order_and_unions_the_rest() {
    let mut first = ModificationLog::new();
    first.register_added_item("a1");
    first.register_updated_item("u1", true);
    first.set_removed_items(Selection::of(["r1"]));

    let mut second = ModificationLog::new();
    second.register_added_item("a2");
    second.register_updated_item("u2", true);
    second.set_removed_items(Selection::of(["r2"]));

    let joined = first.join(&second);
    assert_eq!(joined.added_items(), ["a1", "a2"]);
    assert!(joined.is_updated(&"u1"));
    assert!(joined.is_updated(&"u2"));
    assert_eq!(joined.updated_items().len(), 2);
    assert_eq!(joined.removed_items().len(), 2);
    assert!(joined.removed_items().has_same_item_set(&Selection::of(["r1", "r2"])));
}

#[test]
fn removing_an_added_item_purges_it() {
    let mut log = ModificationLog::new();
    assert!(log.register_added_item(1));
    assert!(!log.register_added_item(1));
    assert_eq!(log.added_items().len(), 1);
    log.register_updated_item(2, true);

    log.set_removed_items(Selection::of([1, 2, 3]));
    assert!(log.added_items().is_empty());
    assert!(log.updated_items().is_empty());
    assert!(log.is_modified());

    log.clear();
    assert!(!log.is_modified());
}

#[test]
fn collection_edits_are_logged() {
    let collection = people(letters());
    let events: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    for topic in [topics::ITEM_ADDED, topics::ITEMS_REMOVED, topics::MODIFICATIONS_CLEARED] {
        let sink = Arc::clone(&events);
        collection
            .modifications()
            .on_change(topic, move |change: &ModificationChange<Person>| {
                sink.lock().unwrap().push(change.event.topic())
            });
    }

    let gina = Person::new("g", 5);
    assert!(collection.add_item(gina.clone()).unwrap());
    assert_eq!(collection.total_item_count().unwrap(), 7);
    assert!(collection.modification_log().is_added(&gina));

    let handler = collection.selection_handler();
    handler.select(&gina, true).unwrap();
    handler.select(&letters()[0], true).unwrap();
    assert_eq!(collection.remove_selected().unwrap(), (2, true));

    let log = collection.modification_log();
    assert!(log.added_items().is_empty());
    assert!(log.removed_items().contains(&letters()[0]));
    assert!(handler.selection().is_empty());
    assert_eq!(
        names(&collection.iter().unwrap().collect::<pageable::Result<Vec<_>>>().unwrap()),
        ["b", "c", "d", "e", "f"]
    );

    assert!(collection.replace_items(letters()).unwrap());
    assert!(!collection.modification_log().is_modified());
    assert_eq!(
        *events.lock().unwrap(),
        [topics::ITEM_ADDED, topics::ITEMS_REMOVED, topics::MODIFICATIONS_CLEARED]
    );
}

#[test]
fn vetoed_log_change_is_reported() {
    let collection = people(letters());
    collection
        .modifications()
        .on_modification_changing(|change| change.new.added_items().len() < 2);

    assert!(collection.add_item(Person::new("x", 1)).unwrap());
    assert!(!collection.add_item(Person::new("y", 2)).unwrap());
    assert_eq!(collection.modification_log().added_items().len(), 1);
}

#[test]
fn removing_a_re_added_item_keeps_the_log_consistent() {
    let collection = people(letters());
    let handler = collection.selection_handler();
    let a = letters()[0].clone();

    handler.select(&a, true).unwrap();
    assert_eq!(collection.remove_selected().unwrap(), (1, true));
    assert!(collection.add_item(a.clone()).unwrap());
    assert!(collection.modification_log().is_added(&a));

    handler.select(&a, true).unwrap();
    assert_eq!(collection.remove_selected().unwrap(), (1, true));
    let log = collection.modification_log();
    assert!(!log.is_added(&a));
    assert!(log.added_items().is_empty());
    assert!(log.removed_items().contains(&a));
    assert_eq!(log.removed_items().len(), 1);
}

#[test]
fn rejected_bookkeeping_is_reported() {
    let collection = people(letters());
    let veto = collection
        .modifications()
        .on_modification_changing(|change| change.new.removed_items().is_empty());
    collection.selection_handler().select(&letters()[1], true).unwrap();

    assert_eq!(collection.remove_selected().unwrap(), (1, false));
    assert_eq!(collection.total_item_count().unwrap(), 5);
    assert!(!collection.modification_log().is_modified());

    collection.modifications().off(veto);
    collection.add_item(Person::new("z", 0)).unwrap();
    collection
        .modifications()
        .on_modification_changing(|change| change.new.is_modified());
    assert!(!collection.replace_items(letters()).unwrap());
    assert_eq!(collection.total_item_count().unwrap(), 6);
    assert_eq!(collection.modification_log().added_items().len(), 1);

    let selection = collection.selection_handler();
    selection.select(&letters()[2], true).unwrap();
    selection.on_selection_changing(|change| !change.new.is_empty());
    assert!(!collection.replace_items(letters()).unwrap());
    assert_eq!(selection.selection().len(), 1);
}

#[test]
fn identifier_backed_collections_are_read_only() {
    let collection = PageableCollection::identifier_backed(Arc::new(RowService::new(10)));
    let err = collection.add_item(Row::new(99)).unwrap_err();
    assert!(matches!(err, CollectionError::Unsupported { capability: "add_item" }));
    assert!(!collection.modification_log().is_modified());

    collection.selection_handler().select(&Row::new(1), true).unwrap();
    assert!(matches!(
        collection.remove_selected(),
        Err(CollectionError::Unsupported { .. })
    ));
    assert!(matches!(
        collection.replace_items(Vec::new()),
        Err(CollectionError::Unsupported { .. })
    ));
}
