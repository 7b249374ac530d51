//! Concurrent workloads over one shared client: a dozen actors issuing
//! independent operations must each observe their own writes, and
//! concurrent first use must converge on a single engine generation.

use std::sync::Arc;
use std::thread;

use memc_client::{BehaviorSet, Client};
use memc_engine::MemoryEngine;

type CacheClient = Client<MemoryEngine>;

const ACTORS: usize = 12;

fn shared_client(behaviors: BehaviorSet) -> Arc<CacheClient> {
    Arc::new(Client::new(["localhost:43042", "localhost:43043"], behaviors).expect("client"))
}

fn join_all(handles: Vec<thread::JoinHandle<()>>) {
    for handle in handles {
        handle.join().expect("actor panicked");
    }
}

#[test]
fn multiple_threads_set_get() {
    let client = shared_client(BehaviorSet::new());

    let handles = (0..ACTORS)
        .map(|n| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                client.set(format!("foo{n}"), format!("v{n}")).expect("set");
                let value = client.get(format!("foo{n}")).expect("get").expect("present");
                assert_eq!(&value[..], format!("v{n}").as_bytes());

                client.set(format!("foz{n}"), format!("v2{n}")).expect("set");
                let value = client.get(format!("foz{n}")).expect("get").expect("present");
                assert_eq!(&value[..], format!("v2{n}").as_bytes());
            })
        })
        .collect();
    join_all(handles);
}

#[test]
fn threads_with_noblock() {
    let behaviors = BehaviorSet::from_pairs([("no_block", true)]).expect("behaviors");
    let client = shared_client(behaviors);

    let handles = (0..ACTORS)
        .map(|n| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for i in 0..100 {
                    client.set(format!("foo{n}{i}"), format!("v{n}")).expect("set");
                }
                let value = client
                    .get(format!("foo{n}2"))
                    .expect("get")
                    .expect("present");
                assert_eq!(&value[..], format!("v{n}").as_bytes());
            })
        })
        .collect();
    join_all(handles);
}

#[test]
fn threads_with_binary_protocol() {
    let behaviors = BehaviorSet::from_pairs([("binary_protocol", true)]).expect("behaviors");
    let client = shared_client(behaviors);

    let handles = (0..ACTORS)
        .map(|n| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for i in 0..100 {
                    client.set(format!("foo{n}{i}"), format!("v{n}")).expect("set");
                }
                let value = client
                    .get(format!("foo{n}2"))
                    .expect("get")
                    .expect("present");
                assert_eq!(&value[..], format!("v{n}").as_bytes());
            })
        })
        .collect();
    join_all(handles);
}

#[test]
fn threads_with_multi_get() {
    let client = shared_client(BehaviorSet::new());

    let handles = (0..ACTORS)
        .map(|n| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                let keys: Vec<String> = (0..100)
                    .map(|i| {
                        let key = format!("foo{n}{i}");
                        client.set(&key, format!("v{n}")).expect("set");
                        key
                    })
                    .collect();

                let values = client.get_multi(&keys).expect("get_multi");
                assert_eq!(values.len(), keys.len());
                for key in keys {
                    assert_eq!(
                        &values[key.as_bytes()][..],
                        format!("v{n}").as_bytes()
                    );
                }
            })
        })
        .collect();
    join_all(handles);
}

#[test]
fn concurrent_first_use_converges_on_one_generation() {
    let client = shared_client(BehaviorSet::new());
    assert!(!client.is_connected());

    let handles = (0..ACTORS)
        .map(|n| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                client.set(format!("gen{n}"), b"v".to_vec()).expect("set");
            })
        })
        .collect();
    join_all(handles);

    assert!(client.is_connected());
    assert_eq!(client.generation(), 1);
}

#[test]
fn concurrent_hot_behavior_mutation_does_not_disturb_operations() {
    let client = shared_client(BehaviorSet::new());

    let toggler = {
        let client = Arc::clone(&client);
        thread::spawn(move || {
            for round in 0..50 {
                client
                    .set_behavior(memc_client::Behavior::Noreply, round % 2 == 0)
                    .expect("set behavior");
            }
        })
    };

    let handles: Vec<_> = (0..ACTORS)
        .map(|n| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for i in 0..50 {
                    let key = format!("hot{n}{i}");
                    client.set(&key, format!("v{n}")).expect("set");
                    let value = client.get(&key).expect("get").expect("present");
                    assert_eq!(&value[..], format!("v{n}").as_bytes());
                }
            })
        })
        .collect();

    toggler.join().expect("toggler panicked");
    join_all(handles);
    assert_eq!(client.generation(), 1);
}
