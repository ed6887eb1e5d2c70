mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pageable::{
    CollectionConfig, ComparisonOperator, FilterNode, MappedSelectionHandler, PageableCollection,
    QueryableAccessor, Selection, SelectionHandling, SelectionMode, SharedAccessor, Value,
};
use support::{letters, name, names, people, Person};

fn selected_names(selection: &Selection<Person>) -> Vec<String> {
    let mut names: Vec<String> = selection
        .iter()
        .map(|p| p.unwrap().name)
        .collect();
    names.sort();
    names
}

#[test]
fn select_all_follows_the_filter() {
    let collection = people(letters());
    collection.query().set_filter(Some(FilterNode::compare(
        &name(),
        ComparisonOperator::InSet,
        Value::from(vec!["a", "c", "e"]),
    )));
    let handler = collection.selection_handler();
    assert!(handler.select_all(true).unwrap());
    assert_eq!(selected_names(&handler.selection()), ["a", "c", "e"]);

    assert!(handler.select_all(false).unwrap());
    assert!(handler.selection().is_empty());
}

#[test]
fn invert_uses_the_current_view() {
    let collection = people(letters());
    let handler = collection.selection_handler();
    let items = collection.items_on_page().unwrap();
    handler.select_items(&items[..2], true).unwrap();

    assert!(handler.invert_selection().unwrap());
    assert_eq!(selected_names(&handler.selection()), ["c", "d", "e", "f"]);
}

#[test]
fn vetoed_changes_report_false_and_keep_state() {
    let collection = people(letters());
    let handler = collection.selection_handler();
    let rejected = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&rejected);
    handler.on_selection_changing(move |change| {
        let ok = change.new.len() <= 2;
        if !ok {
            count.fetch_add(1, Ordering::SeqCst);
        }
        ok
    });
    let announced = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&announced);
    handler.on_selection_changed(move |_| {
        count.fetch_add(1, Ordering::SeqCst);
    });

    let items = letters();
    assert!(handler.select(&items[0], true).unwrap());
    assert!(handler.select(&items[1], true).unwrap());
    assert!(!handler.select(&items[2], true).unwrap());
    assert!(!handler.select_all(true).unwrap());

    assert_eq!(selected_names(&handler.selection()), ["a", "b"]);
    assert_eq!(rejected.load(Ordering::SeqCst), 2);
    assert_eq!(announced.load(Ordering::SeqCst), 2);
}

#[test]
fn selection_mode_comes_from_config() {
    let config = CollectionConfig::from_json(r#"{"selection_mode": "single"}"#).unwrap();
    let accessor: SharedAccessor<Person> = Arc::new(QueryableAccessor);
    let collection =
        PageableCollection::in_memory_with_config(letters(), accessor, &config).unwrap();
    let handler = collection.selection_handler();
    assert_eq!(handler.mode(), SelectionMode::Single);

    let items = letters();
    assert!(handler.select(&items[0], true).unwrap());
    assert!(handler.select(&items[3], true).unwrap());
    assert_eq!(selected_names(&handler.selection()), ["d"]);
    assert!(!handler.select_all(true).unwrap());
}

#[test]
fn no_selection_mode_never_selects() {
    let config = CollectionConfig::default().with_selection_mode(SelectionMode::NoSelection);
    let accessor: SharedAccessor<Person> = Arc::new(QueryableAccessor);
    let collection =
        PageableCollection::in_memory_with_config(letters(), accessor, &config).unwrap();
    let handler = collection.selection_handler();
    assert!(!handler.select(&letters()[0], true).unwrap());
    assert!(!handler.invert_selection().unwrap());
    assert!(handler.selection().is_empty());
}

/// Presentation wrapper around a `Person`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Card {
    title: String,
    person: Person,
}

impl Card {
    fn of(person: &Person) -> Self {
        Card {
            title: person.name.to_uppercase(),
            person: person.clone(),
        }
    }
}

#[test]
fn wrapper_handler_shares_state_with_the_collection() {
    let collection = people(letters());
    let cards = MappedSelectionHandler::new(
        Arc::clone(collection.selection_handler()),
        Card::of,
        |card: &Card| Some(card.person.clone()),
    );
    let seen = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&seen);
    cards.on_selection_changed(move |change| {
        count.fetch_add(change.new.len(), Ordering::SeqCst);
    });

    let first = Card::of(&letters()[0]);
    assert!(cards.select(&first, true).unwrap());
    assert!(collection.selection_handler().selection().contains(&letters()[0]));

    assert!(collection.selection_handler().select(&letters()[1], true).unwrap());
    let titles: Vec<String> = cards
        .selection()
        .iter()
        .map(|card| card.unwrap().title)
        .collect();
    assert_eq!(titles, ["A", "B"]);
    assert_eq!(seen.load(Ordering::SeqCst), 1 + 2);

    assert!(cards.select_all(true).unwrap());
    assert_eq!(cards.selection().len(), 6);
    assert_eq!(names(&collection.selection_handler().selection().to_vec().unwrap()).len(), 6);
}
