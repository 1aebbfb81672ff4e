//! Store example with complex state

use snapstore::{create_selector, devtools, Record, Store, Value};

fn todo(id: i64, text: &str) -> Value {
    Record::new()
        .with("id", id)
        .with("text", text)
        .with("completed", false)
        .into()
}

fn todos(state: &Record) -> Vec<Value> {
    state
        .value("todos")
        .as_list()
        .unwrap_or_default()
        .to_vec()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Store Example ===\n");

    // Create a store with initial state
    let store = Store::new(
        Record::new()
            .with("todos", Vec::<Value>::new())
            .with("filter", "all"),
    )?;
    devtools(&store, "todos");

    let active = create_selector(|state: &Record| {
        todos(state)
            .iter()
            .filter(|t| t.get("completed").as_bool() == Some(false))
            .count()
    });

    // Subscribe to state changes
    let active_count = active.clone();
    store.subscribe(move |next, _prev| {
        println!("State updated! Active todos: {}", active_count.select(next));
    });

    // Add a todo
    println!("Adding todo...");
    store.set_state_with(|state| {
        let mut list = todos(state);
        list.push(todo(1, "Learn snapstore"));
        Record::from([("todos", list)])
    });

    // Complete the todo
    println!("\nCompleting todo...");
    store.set_state_with(|state| {
        let list: Vec<Value> = todos(state)
            .into_iter()
            .map(|t| match t.as_record() {
                Some(record) => record.clone().with("completed", true).into(),
                None => Value::Null,
            })
            .collect();
        Record::from([("todos", list)])
    });

    // Writing the same filter again is not a change
    store.set("filter", "all");

    println!("\nFinal state: {}", store.get_state());
    Ok(())
}
