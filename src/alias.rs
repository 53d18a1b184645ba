//! Alias resolver: colloquial-to-canonical vocabulary rewrites.
//!
//! Users say "rpi", "scope", or "lipo"; the inventory stores "raspberry pi",
//! "oscilloscope", "lithium polymer". The table is an exact, case-insensitive,
//! whole-phrase lookup — no partial or fuzzy matching at this stage. Phrases
//! that miss the table pass through unchanged.

use std::collections::HashMap;

/// Static mapping from colloquial phrase to canonical inventory vocabulary.
///
/// Built once at startup (optionally extended from the config file) and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    /// Build the default lab-inventory alias table.
    pub fn default_lab() -> Self {
        let mut entries = HashMap::new();
        let mut add = |from: &str, to: &str| {
            entries.insert(from.to_string(), to.to_string());
        };

        // Power & batteries
        add("universal power supply", "ups");
        add("uninterruptible power supply", "ups");
        add("battery backup", "ups");
        add("lipo", "lithium polymer");
        add("li po", "lithium polymer");
        add("adapter", "adaptor");
        add("smps", "switched mode power supply");

        // Boards & controllers
        add("rpi", "raspberry pi");
        add("raspi", "raspberry pi");
        add("arduino", "development board arduino");
        add("esp8266", "development board esp8266");
        add("esp32", "development board esp 32");
        add("nucleo", "stm32");
        add("flight controller", "drone flight controller");

        // Components
        add("pot", "potentiometer");
        add("variable resistor", "potentiometer");
        add("stepper", "stepper motor");
        add("servo", "servo motor");
        add("bldc", "bldc motor");
        add("motor driver", "motor driver module");
        add("relay", "relay module");
        add("display", "lcd display");
        add("screen", "lcd display");
        add("oled", "oled display");

        // Tools
        add("solder gun", "soldering iron");
        add("dmm", "multimeter");
        add("cro", "oscilloscope");
        add("dso", "oscilloscope");
        add("scope", "oscilloscope");
        add("function generator", "waveform generator");
        add("hot glue", "glue sticks");

        // Cables & connectors
        add("jumper", "jumper wires");
        add("header", "berg pins");

        // Sensors
        add("distance sensor", "ultrasonic sensor");
        add("sonar", "ultrasonic sensor");
        add("line sensor", "ir sensor module");
        add("ir sensor", "ir sensor module");
        add("pir", "sensor pir");
        add("motion sensor", "sensor pir");
        add("gas sensor", "sensor mq");
        add("smoke sensor", "sensor mq 2");
        add("temp sensor", "temperature sensor");
        add("humidity sensor", "dht sensor");
        add("dht", "dht sensor");
        add("imu", "sensor imu");
        add("gyro", "sensor gyroscopic");
        add("accel", "accelerometer sensor");

        // Brands
        add("ni", "national instruments");
        add("myrio", "ni myrio");

        Self { entries }
    }

    /// An empty table (every phrase passes through).
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add or override entries; keys and values are normalized to
    /// lowercase, single-spaced form.
    pub fn extend(&mut self, overrides: &HashMap<String, String>) {
        for (from, to) in overrides {
            self.entries
                .insert(normalize_key(from), normalize_key(to));
        }
    }

    /// Exact whole-phrase lookup.
    pub fn resolve(&self, phrase: &str) -> Option<&str> {
        self.entries.get(&normalize_key(phrase)).map(String::as_str)
    }

    /// Rewrite a phrase to its canonical form, or pass it through unchanged.
    pub fn rewrite(&self, phrase: &str) -> String {
        match self.resolve(phrase) {
            Some(canonical) => canonical.to_string(),
            None => phrase.to_string(),
        }
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_key(phrase: &str) -> String {
    phrase
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
