//! Integration tests for Snapstore

use std::io;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use snapstore::{
    create_selector, create_selector_with, create_store, devtools, persist, FileStorage,
    MemoryStorage, PersistOptions, Record, Storage, StorageError, StorageResult, Store, Value,
};

fn number(store: &Store, key: &str) -> f64 {
    store.get(key).as_f64().unwrap_or_default()
}

fn list(value: &Value) -> Vec<Value> {
    value.as_list().unwrap_or_default().to_vec()
}

/// A copy of a record value with one field replaced.
fn with_field(item: &Value, key: &str, value: impl Into<Value>) -> Value {
    item.as_record()
        .cloned()
        .unwrap_or_default()
        .with(key, value)
        .into()
}

#[test]
fn end_to_end_counter() {
    let store = create_store(Record::from([("count", 0)])).unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let calls_clone = calls.clone();

    store.subscribe(move |next, prev| {
        calls_clone.lock().unwrap().push((next.clone(), prev.clone()));
    });

    store.set("count", 5);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, Record::from([("count", 5)]));
    assert_eq!(calls[0].1, Record::from([("count", 0)]));
    assert_eq!(store.g(), Record::from([("count", 5)]));
    assert!(store.get_state().ptr_eq(&calls[0].0));
}

#[test]
fn short_aliases_cover_the_whole_api() {
    let store = create_store(Record::from([("count", 0)])).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();

    let subscription = store.u(move |_, _| {
        counter_clone.fetch_add(1, Ordering::SeqCst);
    });
    store.s([("count", 1)]);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    subscription.unsubscribe();
    store.s([("count", 2)]);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    store.d();
    assert_eq!(store.g().value("count").as_i64(), Some(2));
}

#[test]
fn structural_sharing_across_snapshots() {
    let user = Value::from(Record::new().with("name", "John"));
    let store = create_store(Record::new().with("count", 10).with("user", user.clone())).unwrap();

    store.set("count", 11);

    assert!(store.get("user").strict_eq(&user));

    // A fresh but shallow-equal record is not an effective change.
    let before = store.get_state();
    store.set("user", Record::new().with("name", "John"));
    assert!(store.get_state().ptr_eq(&before));
}

#[test]
fn todo_app_state_management() {
    fn todo(id: i64, text: &str, completed: bool) -> Value {
        Record::new()
            .with("id", id)
            .with("text", text)
            .with("completed", completed)
            .into()
    }

    let store = create_store(
        Record::new()
            .with("todos", Vec::<Value>::new())
            .with("filter", "all")
            .with("nextId", 1),
    )
    .unwrap();

    let add_todo = |text: &str| {
        store.set_state_with(|state| {
            let next_id = state.value("nextId").as_i64().unwrap_or(1);
            let mut todos = list(&state.value("todos"));
            todos.push(todo(next_id, text, false));
            Record::new().with("todos", todos).with("nextId", next_id + 1)
        });
    };

    let toggle_todo = |id: i64| {
        store.set_state_with(|state| {
            let todos: Vec<Value> = list(&state.value("todos"))
                .into_iter()
                .map(|t| {
                    if t.get("id").as_i64() == Some(id) {
                        let completed = t.get("completed").as_bool().unwrap_or(false);
                        with_field(&t, "completed", !completed)
                    } else {
                        t
                    }
                })
                .collect();
            Record::from([("todos", todos)])
        });
    };

    let filtered = create_selector(|state: &Record| {
        let todos = list(&state.value("todos"));
        let wanted = match state.value("filter").as_str() {
            Some("active") => Some(false),
            Some("completed") => Some(true),
            _ => None,
        };
        match wanted {
            Some(done) => todos
                .into_iter()
                .filter(|t| t.get("completed").as_bool() == Some(done))
                .collect::<Vec<_>>(),
            None => todos,
        }
    });

    add_todo("Learn snapstore");
    add_todo("Build an app");
    add_todo("Deploy to production");

    assert_eq!(list(&store.get("todos")).len(), 3);
    assert_eq!(filtered.select(&store.g()).len(), 3);

    toggle_todo(1);
    assert_eq!(list(&store.get("todos"))[0].get("completed"), Value::from(true));

    store.set("filter", "active");
    assert_eq!(filtered.select(&store.g()).len(), 2);

    store.set("filter", "completed");
    assert_eq!(filtered.select(&store.g()).len(), 1);
}

#[test]
fn shopping_cart_with_composed_selectors() {
    fn item(id: &str, name: &str, price: f64, quantity: i64) -> Value {
        Record::new()
            .with("id", id)
            .with("name", name)
            .with("price", price)
            .with("quantity", quantity)
            .into()
    }

    let store = create_store(
        Record::new()
            .with("items", Vec::<Value>::new())
            .with("taxRate", 0.08)
            .with("discount", 0),
    )
    .unwrap();

    let subtotal = create_selector(|state: &Record| {
        list(&state.value("items"))
            .iter()
            .map(|i| {
                i.get("price").as_f64().unwrap_or(0.0) * i.get("quantity").as_f64().unwrap_or(0.0)
            })
            .sum::<f64>()
    });

    let tax = {
        let subtotal = subtotal.clone();
        create_selector(move |state: &Record| {
            subtotal.select(state) * state.value("taxRate").as_f64().unwrap_or(0.0)
        })
    };

    let total = {
        let subtotal = subtotal.clone();
        let tax = tax.clone();
        create_selector(move |state: &Record| {
            subtotal.select(state) + tax.select(state)
                - state.value("discount").as_f64().unwrap_or(0.0)
        })
    };

    let add_item = |id: &str, name: &str, price: f64| {
        store.set_state_with(|state| {
            let mut items = list(&state.value("items"));
            match items.iter().position(|i| i.get("id").as_str() == Some(id)) {
                Some(index) => {
                    let existing = items[index].clone();
                    let quantity = existing.get("quantity").as_i64().unwrap_or(0);
                    items[index] = item(id, name, price, quantity + 1);
                }
                None => items.push(item(id, name, price, 1)),
            }
            Record::from([("items", items)])
        });
    };

    let update_quantity = |id: &str, quantity: i64| {
        store.set_state_with(|state| {
            let items: Vec<Value> = list(&state.value("items"))
                .into_iter()
                .map(|i| {
                    if i.get("id").as_str() == Some(id) {
                        with_field(&i, "quantity", quantity)
                    } else {
                        i
                    }
                })
                .collect();
            Record::from([("items", items)])
        });
    };

    let remove_item = |id: &str| {
        store.set_state_with(|state| {
            let items: Vec<Value> = list(&state.value("items"))
                .into_iter()
                .filter(|i| i.get("id").as_str() != Some(id))
                .collect();
            Record::from([("items", items)])
        });
    };

    add_item("1", "Widget", 10.0);
    add_item("2", "Gadget", 20.0);
    add_item("1", "Widget", 10.0);

    let items = list(&store.get("items"));
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].get("quantity").as_i64(), Some(2));

    assert_eq!(subtotal.select(&store.g()), 40.0);
    assert!((tax.select(&store.g()) - 3.2).abs() < 1e-9);
    assert!((total.select(&store.g()) - 43.2).abs() < 1e-9);

    store.set("discount", 5);
    assert!((total.select(&store.g()) - 38.2).abs() < 1e-9);

    update_quantity("2", 3);
    assert_eq!(subtotal.select(&store.g()), 80.0);

    remove_item("1");
    assert_eq!(list(&store.get("items")).len(), 1);
    assert!((total.select(&store.g()) - 59.8).abs() < 1e-9);
    assert_eq!(number(&store, "discount"), 5.0);
}

#[test]
fn form_state_with_validation() {
    let store = create_store(
        Record::new()
            .with(
                "values",
                Record::new()
                    .with("email", "")
                    .with("password", "")
                    .with("confirmPassword", ""),
            )
            .with("errors", Record::new())
            .with("touched", Record::new())
            .with("isSubmitting", false),
    )
    .unwrap();

    let field = |key: &str, name: &str| -> Value { store.get(key).get(name) };

    let set_value = |name: &str, value: &str| {
        store.set_state_with(|state| {
            let values = state.value("values").as_record().cloned().unwrap_or_default();
            let errors = state.value("errors").as_record().cloned().unwrap_or_default();
            Record::new()
                .with("values", values.with(name, value))
                .with("errors", errors.with(name, ""))
        });
    };

    let set_touched = |name: &str| {
        store.set_state_with(|state| {
            let touched = state.value("touched").as_record().cloned().unwrap_or_default();
            Record::from([("touched", touched.with(name, true))])
        });
    };

    let validate = || {
        let values = store.get("values");
        let email = values.get("email").as_str().unwrap_or_default().to_owned();
        let password = values.get("password").as_str().unwrap_or_default().to_owned();
        let confirm = values.get("confirmPassword").as_str().unwrap_or_default().to_owned();

        let mut errors = Record::new();
        if email.is_empty() {
            errors = errors.with("email", "Email is required");
        } else if !email.contains('@') || !email.split('@').nth(1).is_some_and(|d| d.contains('.')) {
            errors = errors.with("email", "Invalid email address");
        }
        if password.is_empty() {
            errors = errors.with("password", "Password is required");
        } else if password.len() < 8 {
            errors = errors.with("password", "Password must be at least 8 characters");
        }
        if password != confirm {
            errors = errors.with("confirmPassword", "Passwords do not match");
        }
        let valid = errors.is_empty();
        store.set("errors", errors);
        valid
    };

    let is_valid = create_selector(|state: &Record| {
        let no_errors = state.value("errors").as_record().is_some_and(Record::is_empty);
        let filled = state
            .value("values")
            .as_record()
            .is_some_and(|values| values.iter().all(|(_, v)| v.as_str() != Some("")));
        no_errors && filled
    });

    set_value("email", "test");
    set_touched("email");
    validate();
    assert_eq!(field("errors", "email"), Value::from("Invalid email address"));
    assert_eq!(field("touched", "email"), Value::from(true));

    set_value("email", "test@example.com");
    validate();
    assert!(field("errors", "email").is_undefined());

    set_value("password", "12345");
    validate();
    assert_eq!(
        field("errors", "password"),
        Value::from("Password must be at least 8 characters")
    );

    set_value("password", "12345678");
    set_value("confirmPassword", "12345679");
    validate();
    assert_eq!(field("errors", "confirmPassword"), Value::from("Passwords do not match"));

    set_value("confirmPassword", "12345678");
    assert!(validate());
    assert!(is_valid.select(&store.g()));

    store.set("isSubmitting", true);
    assert_eq!(store.get("isSubmitting"), Value::from(true));
}

#[test]
fn large_state_updates() {
    let items: Vec<Value> = (0..1000)
        .map(|i| Record::new().with("id", i).with("value", i).into())
        .collect();
    let store = create_store(Record::from([("items", items)])).unwrap();

    for target in 0..100 {
        store.set_state_with(|state| {
            let items: Vec<Value> = list(&state.value("items"))
                .into_iter()
                .map(|item| {
                    if item.get("id").as_i64() == Some(target) {
                        let value = item.get("value").as_i64().unwrap_or(0);
                        with_field(&item, "value", value * 2)
                    } else {
                        item
                    }
                })
                .collect();
            Record::from([("items", items)])
        });
    }

    let items = list(&store.get("items"));
    assert_eq!(items[0].get("value").as_i64(), Some(0));
    assert_eq!(items[50].get("value").as_i64(), Some(100));
    assert_eq!(items[99].get("value").as_i64(), Some(198));
    assert_eq!(items[100].get("value").as_i64(), Some(100));
}

#[test]
fn unrelated_key_change_produces_a_new_snapshot_for_selectors() {
    let data: Vec<i64> = (0..1000).collect();
    let store = create_store(Record::new().with("data", data).with("filter", 0)).unwrap();

    let runs = Arc::new(AtomicUsize::new(0));
    let runs_clone = runs.clone();
    let evens = create_selector_with(
        move |state: &Record| {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            list(&state.value("data"))
                .iter()
                .filter(|n| n.as_i64().is_some_and(|n| n % 2 == 0))
                .count()
        },
        |prev: &usize, next: &usize| prev == next,
    );

    assert_eq!(evens.select(&store.g()), 500);
    assert_eq!(evens.select(&store.g()), 500);
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // Memoization is keyed on the snapshot reference, which every effective
    // change replaces.
    store.set("filter", 1);
    assert_eq!(evens.select(&store.g()), 500);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    let mut data = list(&store.get("data"));
    data.push(Value::from(1001));
    store.set("data", data);
    assert_eq!(evens.select(&store.g()), 500);
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

struct FailingStorage {
    writes: AtomicUsize,
}

impl Storage for FailingStorage {
    fn get_item(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Io(io::Error::new(io::ErrorKind::Other, "unavailable")))
    }

    fn set_item(&self, _key: &str, _value: &str) -> StorageResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Io(io::Error::new(io::ErrorKind::Other, "Storage full")))
    }

    fn remove_item(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }
}

#[test]
fn persist_survives_storage_failures() {
    let storage = Arc::new(FailingStorage {
        writes: AtomicUsize::new(0),
    });
    let store = create_store(Record::from([("count", 0)])).unwrap();

    persist(&store, PersistOptions::new("test-store").shared_storage(storage.clone()));
    store.set("count", 1);

    assert_eq!(store.get("count").as_i64(), Some(1));
    assert_eq!(storage.writes.load(Ordering::SeqCst), 2);
}

#[test]
fn persist_keeps_initial_state_on_invalid_data() {
    let storage = MemoryStorage::new().with_item("test-store", "invalid json");
    let store = create_store(Record::new().with("count", 0).with("name", "initial")).unwrap();

    persist(&store, PersistOptions::new("test-store").storage(storage));

    assert_eq!(store.get("count").as_i64(), Some(0));
    assert_eq!(store.get("name"), Value::from("initial"));
}

#[test]
fn persist_complex_state() {
    let storage = Arc::new(MemoryStorage::new());
    let store = create_store(
        Record::new()
            .with(
                "user",
                Record::new()
                    .with("id", 1)
                    .with("name", "John")
                    .with("settings", Record::from([("theme", "dark")])),
            )
            .with("items", vec![1, 2, 3])
            .with("active", true)
            .with("meta", Value::Null),
    )
    .unwrap();

    persist(&store, PersistOptions::new("complex-store").shared_storage(storage.clone()));

    assert_eq!(
        storage.item("complex-store").as_deref(),
        Some(r#"{"user":{"id":1,"name":"John","settings":{"theme":"dark"}},"items":[1,2,3],"active":true,"meta":null}"#)
    );
}

#[test]
fn persist_restores_across_sessions_from_files() {
    let dir = tempfile::tempdir().unwrap();

    {
        let storage = FileStorage::open(dir.path()).unwrap();
        let store = create_store(Record::from([("count", 0)])).unwrap();
        persist(&store, PersistOptions::new("counter").storage(storage));
        store.set("count", 7);
    }

    let storage = FileStorage::open(dir.path()).unwrap();
    let store = create_store(Record::from([("count", 0)])).unwrap();
    persist(&store, PersistOptions::new("counter").storage(storage));

    assert_eq!(store.get("count").as_i64(), Some(7));
}

#[test]
fn middleware_composition() {
    let storage = Arc::new(MemoryStorage::new());
    let store = create_store(Record::from([("count", 0)])).unwrap();

    persist(&store, PersistOptions::new("test-store").shared_storage(storage.clone()));
    devtools(&store, "TestStore");

    store.set_state([("count", 1)]);

    assert_eq!(store.subscriber_count(), 2);
    assert_eq!(storage.item("test-store").as_deref(), Some(r#"{"count":1}"#));
}

#[test]
fn store_shared_across_threads() {
    let store = create_store(Record::from([("a", 0), ("b", 0)])).unwrap();
    let notifications = Arc::new(AtomicUsize::new(0));
    let notifications_clone = notifications.clone();
    store.subscribe(move |_, _| {
        notifications_clone.fetch_add(1, Ordering::SeqCst);
    });

    let handles: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|key| {
            let store = store.clone();
            std::thread::spawn(move || {
                for n in 1..=50 {
                    store.set(key, n);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get("a").as_i64(), Some(50));
    assert_eq!(store.get("b").as_i64(), Some(50));
    assert_eq!(notifications.load(Ordering::SeqCst), 100);
}
