//! Tests for module registration, configuration and loading

use marvin_core::*;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct GreetConfig {
    greeting: String,
    repeat: u32,
    channels: Vec<String>,
}

/// What a test module observed while being loaded
#[derive(Default)]
struct Observed {
    loaded: Vec<String>,
    settings: HashMap<String, GreetConfig>,
}

struct GreetModule {
    name: &'static str,
    fail: bool,
    config: GreetConfig,
    observed: Arc<Mutex<Observed>>,
}

impl GreetModule {
    fn new(name: &'static str, observed: &Arc<Mutex<Observed>>) -> Box<Self> {
        Box::new(Self {
            name,
            fail: false,
            config: GreetConfig::default(),
            observed: Arc::clone(observed),
        })
    }

    fn failing(name: &'static str, observed: &Arc<Mutex<Observed>>) -> Box<Self> {
        let mut module = Self::new(name, observed);
        module.fail = true;
        module
    }
}

impl Module for GreetModule {
    fn name(&self) -> &str {
        self.name
    }

    fn help(&self) -> &str {
        "Greets people"
    }

    fn defaults(&mut self) {
        self.config.greeting = "hello".to_string();
        self.config.repeat = 1;
    }

    fn settings(&mut self) -> &mut dyn Settings {
        &mut self.config
    }

    fn load(&mut self, client: &mut Client) -> Result<()> {
        let mut observed = self.observed.lock();
        observed.loaded.push(self.name.to_string());
        observed.settings.insert(self.name.to_string(), self.config.clone());
        if self.fail {
            return Err(Error::Module("cannot greet".to_string()));
        }

        client.register_hook("join", |_: &Client, _: &Message| -> Result<()> { Ok(()) });
        Ok(())
    }
}

fn blob(entries: serde_json::Value) -> HashMap<String, serde_json::Value> {
    serde_json::from_value(entries).unwrap()
}

#[test]
fn test_defaults_kept_without_fragment() {
    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut client = Client::new(tokio::io::sink());

    let mut set = ModuleSet::new(blob(json!({ "other": { "greeting": "hi" } })));
    set.register(GreetModule::new("greet", &observed)).unwrap();
    set.load_all(&mut client).unwrap();

    let observed = observed.lock();
    assert_eq!(
        observed.settings["greet"],
        GreetConfig {
            greeting: "hello".to_string(),
            repeat: 1,
            channels: Vec::new(),
        }
    );
}

#[test]
fn test_fragment_overrides_defaults() {
    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut client = Client::new(tokio::io::sink());

    let mut set = ModuleSet::new(blob(json!({
        "greet": { "greeting": "moin", "channels": ["#a"] }
    })));
    set.register(GreetModule::new("greet", &observed)).unwrap();
    set.load_all(&mut client).unwrap();

    let observed = observed.lock();
    let settings = &observed.settings["greet"];
    assert_eq!(settings.greeting, "moin");
    assert_eq!(settings.repeat, 1);
    assert_eq!(settings.channels, vec!["#a"]);
}

#[test]
fn test_load_stops_at_first_failure() {
    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut client = Client::new(tokio::io::sink());

    let mut set = ModuleSet::default();
    set.register(GreetModule::new("first", &observed)).unwrap();
    set.register(GreetModule::failing("broken", &observed)).unwrap();
    set.register(GreetModule::new("never", &observed)).unwrap();

    let err = set.load_all(&mut client).unwrap_err();
    assert!(err.to_string().contains("broken"));
    assert!(err.to_string().contains("cannot greet"));

    assert_eq!(observed.lock().loaded, vec!["first", "broken"]);
    // hooks of modules loaded before the failure stay registered
    assert_eq!(client.hook_count("join"), 1);
}

#[test]
fn test_bad_fragment_fails_before_load() {
    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut client = Client::new(tokio::io::sink());

    let mut set = ModuleSet::new(blob(json!({ "greet": { "repeat": "twice" } })));
    set.register(GreetModule::new("greet", &observed)).unwrap();

    assert!(matches!(set.load_all(&mut client), Err(Error::Module(_))));
    assert!(observed.lock().loaded.is_empty());
}

#[test]
fn test_duplicate_names_rejected() {
    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut set = ModuleSet::default();
    set.register(GreetModule::new("greet", &observed)).unwrap();

    assert!(set.register(GreetModule::new("greet", &observed)).is_err());
    assert_eq!(set.len(), 1);
}

#[test]
fn test_modules_load_in_registration_order() {
    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut client = Client::new(tokio::io::sink());

    let mut set = ModuleSet::default();
    for name in ["c", "a", "b"] {
        set.register(GreetModule::new(name, &observed)).unwrap();
    }
    assert_eq!(
        set.help_index(),
        vec![
            ("c".to_string(), "Greets people".to_string()),
            ("a".to_string(), "Greets people".to_string()),
            ("b".to_string(), "Greets people".to_string()),
        ]
    );
    set.load_all(&mut client).unwrap();

    assert_eq!(observed.lock().loaded, vec!["c", "a", "b"]);
    assert_eq!(client.hook_count("join"), 3);
}

#[test]
fn test_config_file_feeds_module_set() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    std::io::Write::write_all(
        &mut file,
        br##"
[bot]
nick = "marvin"
channels = ["#a", "#b"]

[modules.greet]
greeting = "servus"
repeat = 3
"##,
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    config.validate().unwrap();

    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut client = Client::new(tokio::io::sink());
    let mut set = ModuleSet::new(config.modules.clone());
    set.register(GreetModule::new("greet", &observed)).unwrap();
    set.load_all(&mut client).unwrap();

    let observed = observed.lock();
    let settings = &observed.settings["greet"];
    assert_eq!(settings.greeting, "servus");
    assert_eq!(settings.repeat, 3);
}

#[test]
fn test_json_config_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    std::io::Write::write_all(
        &mut file,
        br##"{ "bot": { "nick": "marvin", "channels": ["#a"] }, "modules": { "url": { "exclude": ["example.org"] } } }"##,
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.bot.channels, vec!["#a"]);
    assert_eq!(config.server.port, 6667);
    assert_eq!(config.modules["url"], json!({ "exclude": ["example.org"] }));
}
