//! Construction and validation scenarios: topology parsing, config-string
//! tokens, behavior constraints, namespace rules, and the no-connect
//! contract.

use memc_client::{
    Behavior, BehaviorSet, BehaviorValue, Client, ClientError, Distribution, DEFAULT_PORT,
};
use memc_engine::MemoryEngine;

type CacheClient = Client<MemoryEngine>;

const SERVERS: [&str; 2] = ["localhost:43042", "localhost:43043"];

fn client(servers: [&str; 2]) -> CacheClient {
    Client::new(servers, BehaviorSet::new()).expect("client")
}

#[test]
fn initialize_without_servers() {
    let client = CacheClient::new((), BehaviorSet::new()).expect("client");
    assert!(client.config_string().contains("--SERVER=localhost:11211"));

    let servers = client.servers();
    assert_eq!(servers[0].hostname(), "localhost");
    assert_eq!(servers[0].port(), 11211);
}

#[test]
fn initialize_with_multiple_servers() {
    let client = client(SERVERS);
    let config = client.config_string();
    assert!(config.contains("--SERVER=localhost:43042"));
    assert!(config.contains("--SERVER=localhost:43043"));
}

#[test]
fn initialize_with_multiple_servers_and_socket() {
    let client = CacheClient::new(
        ["localhost:43042", "localhost:43043", "/tmp/memcached0"],
        BehaviorSet::new(),
    )
    .expect("client");

    let config = client.config_string();
    assert!(config.contains("--SERVER=localhost:43042"));
    assert!(config.contains("--SERVER=localhost:43043"));
    assert!(config.contains("--SOCKET=\"/tmp/memcached0\""));

    let endpoints: Vec<(String, u16)> = client
        .servers()
        .iter()
        .map(|server| (server.hostname().to_string(), server.port()))
        .collect();
    assert_eq!(
        endpoints,
        [
            ("localhost".to_string(), 43042),
            ("localhost".to_string(), 43043),
            ("/tmp/memcached0".to_string(), 0),
        ]
    );
}

#[test]
fn initialize_with_ip_addresses() {
    let client = client(["127.0.0.1:43042", "127.0.0.1:43043"]);
    let servers = client.servers();
    assert_eq!(servers.first().unwrap().hostname(), "127.0.0.1");
    assert_eq!(servers.last().unwrap().hostname(), "127.0.0.1");
}

#[test]
fn initialize_without_port() {
    let client = CacheClient::new("localhost", BehaviorSet::new()).expect("client");
    let servers = client.servers();
    assert_eq!(servers[0].hostname(), "localhost");
    assert_eq!(servers[0].port(), 11211);
}

#[test]
fn initialize_with_ports_and_weights() {
    let client = client(["localhost:43042/?2", "localhost:43043/?10"]);
    let config = client.config_string();
    assert!(config.contains("--SERVER=localhost:43042/?2"));
    assert!(config.contains("--SERVER=localhost:43043/?10"));

    let servers = client.servers();
    assert_eq!(servers[0].weight(), Some(2));
    assert_eq!(servers[1].weight(), Some(10));
}

#[test]
fn initialize_with_hostname_only() {
    let addresses: Vec<String> = (1..=8).map(|i| format!("app-cache-{i:02}")).collect();
    let client = CacheClient::new(addresses.clone(), BehaviorSet::new()).expect("client");

    for (index, address) in addresses.iter().enumerate() {
        let server = &client.servers()[index];
        assert_eq!(server.hostname(), address.as_str());
        assert_eq!(server.port(), DEFAULT_PORT);
    }
}

#[test]
fn initialize_with_ip_address_and_options() {
    let behaviors = BehaviorSet::from_pairs([("ketama_weighted", false)]).expect("behaviors");
    let client = CacheClient::new("127.0.0.1:43042", behaviors).expect("client");
    assert_eq!(client.servers()[0].hostname(), "127.0.0.1");
    assert_eq!(
        client.get_behavior(Behavior::KetamaWeighted),
        BehaviorValue::Bool(false)
    );
}

#[test]
fn behaviors_are_settable_after_construction() {
    let client = client(SERVERS);
    assert!(!client.get_behavior(Behavior::NoBlock).as_bool());
    client.set_behavior(Behavior::NoBlock, true).expect("set");
    assert!(client.get_behavior(Behavior::NoBlock).as_bool());
}

#[test]
fn initialize_with_invalid_server_strings() {
    for spec in [":43042", "localhost:memcached", "local host:43043:1"] {
        let err = CacheClient::new(spec, BehaviorSet::new()).unwrap_err();
        assert!(
            matches!(err, ClientError::InvalidServerSpec { .. }),
            "{spec} should be rejected"
        );
    }
}

#[test]
fn initialize_with_sort_hosts_and_consistent_distribution() {
    let err = BehaviorSet::from_pairs([
        ("sort_hosts", BehaviorValue::Bool(true)),
        (
            "distribution",
            BehaviorValue::Distribution(Distribution::Consistent),
        ),
    ])
    .unwrap_err();
    assert!(matches!(
        ClientError::from(err),
        ClientError::InvalidOption(_)
    ));

    // The same distribution without host sorting is accepted.
    let behaviors = BehaviorSet::new()
        .with(Behavior::Distribution, Distribution::Consistent)
        .expect("behaviors");
    assert!(CacheClient::new(SERVERS, behaviors).is_ok());
}

#[test]
fn initialize_with_invalid_options() {
    let err = BehaviorSet::from_pairs([("foo", true)]).unwrap_err();
    assert!(matches!(
        ClientError::from(err),
        ClientError::InvalidOption(_)
    ));
}

#[test]
fn initialize_with_oversized_prefix_key() {
    let behaviors =
        BehaviorSet::from_pairs([("prefix_key", "x".repeat(128))]).expect("behaviors");
    let client = CacheClient::new(SERVERS, behaviors).expect("construction is eager-valid");

    // The key-budget check is lazy: only connecting trips it.
    assert!(!client.is_connected());
    let err = client.connect().unwrap_err();
    assert!(matches!(err, ClientError::KeyTooBig { length: 128, .. }));
    assert!(!client.is_connected());
}

#[test]
fn set_namespace() {
    let behaviors = BehaviorSet::from_pairs([("prefix_key", "foo")]).expect("behaviors");
    let client = CacheClient::new(SERVERS, behaviors).expect("client");
    assert_eq!(client.namespace(), Some("foo".to_string()));

    client.set_namespace(Some("bar")).expect("set");
    assert_eq!(client.namespace(), Some("bar".to_string()));
}

#[test]
fn set_namespace_to_empty_string() {
    let behaviors = BehaviorSet::from_pairs([("prefix_key", "foo")]).expect("behaviors");
    let client = CacheClient::new(SERVERS, behaviors).expect("client");

    let err = client.set_namespace(Some("")).unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert_eq!(client.namespace(), Some("foo".to_string()));
}

#[test]
fn set_namespace_to_none() {
    let behaviors = BehaviorSet::from_pairs([("prefix_key", "foo")]).expect("behaviors");
    let client = CacheClient::new(SERVERS, behaviors).expect("client");

    client.set_namespace(None).expect("clear");
    assert_eq!(client.namespace(), None);
}

#[test]
fn initialize_with_negative_behavior() {
    let behaviors = BehaviorSet::from_pairs([("buffer_requests", false)]).expect("behaviors");
    let client = CacheClient::new(SERVERS, behaviors).expect("client");
    client.set("key", &b"value"[..]).expect("set");
}

#[test]
fn initialize_sort_hosts() {
    let sorted = ["localhost:43042", "localhost:43043"];
    let reversed = ["localhost:43043", "localhost:43042"];

    let texts = |client: &CacheClient| -> Vec<String> {
        client.servers().iter().map(|s| s.to_string()).collect()
    };

    let behaviors = |sort: bool| {
        BehaviorSet::new()
            .with(Behavior::SortHosts, sort)
            .unwrap()
            .with(Behavior::Distribution, Distribution::Modula)
            .unwrap()
    };

    // Already sorted input stays put either way.
    let client = CacheClient::new(sorted, behaviors(false)).expect("client");
    assert_eq!(texts(&client), sorted);
    let client = CacheClient::new(sorted, behaviors(true)).expect("client");
    assert_eq!(texts(&client), sorted);

    // Reversed input is preserved unless sorting is requested.
    let client = CacheClient::new(reversed, behaviors(false)).expect("client");
    assert_eq!(texts(&client), reversed);
    let client = CacheClient::new(reversed, behaviors(true)).expect("client");
    assert_eq!(texts(&client), sorted);
}

#[test]
fn initialize_should_not_connect() {
    let behaviors = BehaviorSet::from_pairs([
        ("distribution", BehaviorValue::Distribution(Distribution::Modula)),
        ("prefix_key", BehaviorValue::Str("prefix".to_string())),
    ])
    .expect("behaviors");
    let client = CacheClient::new(SERVERS, behaviors).expect("client");

    assert!(!client.is_connected());
    assert_eq!(client.generation(), 0);
}
