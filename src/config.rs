use std::{collections::{HashMap, HashSet}, env, path::PathBuf, str::FromStr};

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use derive_deref::{Deref, DerefMut};
use directories::ProjectDirs;
use lazy_static::lazy_static;
use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize, de::Deserializer};

use crate::action::Action;
use crate::expression::Expression;
use crate::schema::{Schema, SchemaError};
use crate::serializer::MultiValuePolicy;

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Global,
    QueryBar,
}

const CONFIG: &str = include_str!("../.config/config.json5");
const SCHEMA: &str = include_str!("../.config/schema.json5");

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

/// Settings of the query bar and the serializer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    /// Keys serialized as arrays
    #[serde(default)]
    pub multi_value_keys: MultiValuePolicy,
    /// Mandatory keys: backspace clears their value but never removes them
    #[serde(default)]
    pub not_editable: HashSet<String>,
    #[serde(default = "default_max_visible_options")]
    pub max_visible_options: usize,
    /// Schema file; the embedded demo schema is used when absent
    #[serde(default)]
    pub schema_path: Option<PathBuf>,
    #[serde(default)]
    pub initial: Vec<Expression>,
    /// `dark` or `light`
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_placeholder() -> String {
    "Search or filter results...".to_string()
}

fn default_max_visible_options() -> usize {
    8
}

fn default_theme() -> String {
    "dark".to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
            multi_value_keys: MultiValuePolicy::default(),
            not_editable: HashSet::new(),
            max_visible_options: default_max_visible_options(),
            schema_path: None,
            initial: Vec::new(),
            theme: default_theme(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub keybindings: KeyBindings,
    #[serde(default)]
    pub styles: Styles,
    #[serde(default)]
    pub query: QueryConfig,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

impl Config {
    /// Embedded defaults, then `config.json5` in the config dir, then `config_path`.
    pub fn from_path(config_path: Option<&PathBuf>) -> Result<Self, config::ConfigError> {
        let default_config = Self::embedded()?;
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .add_source(config::File::from_str(CONFIG, config::FileFormat::Json5))
            .add_source(
                config::File::from(config_dir.join("config.json5"))
                    .format(config::FileFormat::Json5)
                    .required(false),
            );
        if let Some(path) = config_path {
            builder = builder.add_source(
                config::File::from(path.clone()).format(config::FileFormat::Json5).required(true),
            );
        }

        let mut cfg: Self = builder.build()?.try_deserialize()?;

        for (mode, default_bindings) in default_config.keybindings.iter() {
            let user_bindings = cfg.keybindings.entry(*mode).or_default();
            for (key, cmd) in default_bindings.iter() {
                user_bindings
                    .entry(key.clone())
                    .or_insert_with(|| cmd.clone());
            }
        }
        for (mode, default_styles) in default_config.styles.iter() {
            let user_styles = cfg.styles.entry(*mode).or_default();
            for (style_key, style) in default_styles.iter() {
                user_styles.entry(style_key.clone()).or_insert(*style);
            }
        }

        Ok(cfg)
    }

    /// The configuration compiled into the binary.
    pub fn embedded() -> Result<Self, config::ConfigError> {
        json5::from_str(CONFIG).map_err(|e| config::ConfigError::Message(e.to_string()))
    }

    /// Schema from `query.schema_path`, or the embedded demo schema.
    pub fn load_schema(&self) -> Result<Schema, SchemaError> {
        match &self.query.schema_path {
            Some(path) => Schema::from_path(path),
            None => Schema::from_json5(SCHEMA),
        }
    }

    /// Build instructions string from list of (mode, action) tuples
    pub fn actions_to_instructions(&self, actions: &[(Mode, Action)]) -> String {
        actions.iter()
            .map(|(mode, action)| {
                let friendly_name = action_to_friendly_name(action);
                if let Some(key) = self.key_for_action(*mode, action) {
                    format!("{key}: {friendly_name}")
                } else {
                    friendly_name.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    }

    /// Resolve an action for a full key sequence for a given mode.
    pub fn action_for_keys(&self, mode: Mode, keys: &[KeyEvent]) -> Option<Action> {
        let map = self.keybindings.get(&mode)?;
        map.get(keys).cloned()
    }

    /// Resolve an action for a single key event for a given mode.
    pub fn action_for_key(&self, mode: Mode, key: KeyEvent) -> Option<Action> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        self.action_for_keys(mode, &[key])
    }

    /// Find the key for a given action in a specific mode
    pub fn key_for_action(&self, mode: Mode, action: &Action) -> Option<String> {
        let mode_bindings = self.keybindings.get(&mode)?;
        let mut keys: Vec<String> = mode_bindings
            .iter()
            .filter(|(_, bound)| *bound == action)
            .map(|(seq, _)| seq.iter().map(key_event_to_string).collect::<Vec<_>>().join(" "))
            .collect();
        // Stable pick when several keys share an action
        keys.sort();
        keys.into_iter().next()
    }
}

/// Short label of an action for the instructions strip.
pub fn action_to_friendly_name(action: &Action) -> &'static str {
    match action {
        Action::Quit => "Quit",
        Action::Suspend => "Suspend",
        Action::ToggleInstructions => "Toggle Instructions",
        Action::FocusQueryBar => "Focus",
        Action::ClearExpressions => "Clear",
        Action::CopyQuery => "Copy Query",
        _ => "Unknown",
    }
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("rs", "querybar", env!("CARGO_PKG_NAME"))
}

#[derive(Clone, Debug, Default, Deref, DerefMut)]
pub struct KeyBindings(pub HashMap<Mode, HashMap<Vec<KeyEvent>, Action>>);

impl<'de> Deserialize<'de> for KeyBindings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed_map = HashMap::<Mode, HashMap<String, Action>>::deserialize(deserializer)?;

        let mut keybindings = HashMap::new();
        for (mode, inner_map) in parsed_map {
            let mut converted = HashMap::new();
            for (key_string, action) in inner_map {
                let sequence = parse_key_sequence(&key_string).map_err(serde::de::Error::custom)?;
                converted.insert(sequence, action);
            }
            keybindings.insert(mode, converted);
        }

        Ok(KeyBindings(keybindings))
    }
}

fn parse_key_event(raw: &str) -> Result<KeyEvent, String> {
    let raw_lower = raw.to_ascii_lowercase();
    let (remaining, modifiers) = extract_modifiers(&raw_lower);
    parse_key_code_with_modifiers(remaining, modifiers)
}

fn extract_modifiers(raw: &str) -> (&str, KeyModifiers) {
    let mut modifiers = KeyModifiers::empty();
    let mut current = raw;

    loop {
        if let Some(rest) = current.strip_prefix("ctrl-") {
            modifiers.insert(KeyModifiers::CONTROL);
            current = rest;
        } else if let Some(rest) = current.strip_prefix("alt-") {
            modifiers.insert(KeyModifiers::ALT);
            current = rest;
        } else if let Some(rest) = current.strip_prefix("shift-") {
            modifiers.insert(KeyModifiers::SHIFT);
            current = rest;
        } else {
            break;
        }
    }

    (current, modifiers)
}

fn parse_key_code_with_modifiers(
    raw: &str,
    mut modifiers: KeyModifiers,
) -> Result<KeyEvent, String> {
    let code = match raw {
        "esc" => KeyCode::Esc,
        "enter" => KeyCode::Enter,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "backtab" => {
            modifiers.insert(KeyModifiers::SHIFT);
            KeyCode::BackTab
        }
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "insert" => KeyCode::Insert,
        "space" => KeyCode::Char(' '),
        "hyphen" | "minus" => KeyCode::Char('-'),
        "tab" => KeyCode::Tab,
        f if f.len() > 1 && f.starts_with('f') => match f[1..].parse::<u8>() {
            Ok(n) if (1..=12).contains(&n) => KeyCode::F(n),
            _ => return Err(format!("Unable to parse {raw}")),
        },
        c if c.chars().count() == 1 => {
            let mut c = c.chars().next().ok_or_else(|| format!("Unable to parse {raw}"))?;
            if modifiers.contains(KeyModifiers::SHIFT) {
                c = c.to_ascii_uppercase();
            }
            KeyCode::Char(c)
        }
        _ => return Err(format!("Unable to parse {raw}")),
    };
    Ok(KeyEvent::new(code, modifiers))
}

pub fn key_event_to_string(key_event: &KeyEvent) -> String {
    let key_code = match key_event.code {
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        KeyCode::Tab => "tab".to_string(),
        KeyCode::BackTab => "backtab".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Insert => "insert".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        _ => String::new(),
    };

    let mut parts = Vec::with_capacity(4);
    if key_event.modifiers.intersects(KeyModifiers::CONTROL) {
        parts.push("ctrl".to_string());
    }
    if key_event.modifiers.intersects(KeyModifiers::SHIFT) {
        parts.push("shift".to_string());
    }
    if key_event.modifiers.intersects(KeyModifiers::ALT) {
        parts.push("alt".to_string());
    }
    parts.push(key_code);
    parts.join("-")
}

pub fn parse_key_sequence(raw: &str) -> Result<Vec<KeyEvent>, String> {
    if raw.chars().filter(|c| *c == '>').count() != raw.chars().filter(|c| *c == '<').count() {
        return Err(format!("Unable to parse `{raw}`"));
    }
    let raw = if !raw.contains("><") {
        let raw = raw.strip_prefix('<').unwrap_or(raw);
        raw.strip_suffix('>').unwrap_or(raw)
    } else {
        raw
    };
    raw.split("><")
        .map(|seq| {
            let seq = seq.strip_prefix('<').unwrap_or(seq);
            seq.strip_suffix('>').unwrap_or(seq)
        })
        .map(parse_key_event)
        .collect()
}

#[derive(Clone, Debug, Default, Deref, DerefMut)]
pub struct Styles(pub HashMap<Mode, HashMap<String, Style>>);

impl<'de> Deserialize<'de> for Styles {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed_map = HashMap::<Mode, HashMap<String, String>>::deserialize(deserializer)?;

        let styles = parsed_map
            .into_iter()
            .map(|(mode, inner_map)| {
                let converted = inner_map
                    .into_iter()
                    .map(|(key, style_string)| (key, parse_style(&style_string)))
                    .collect();
                (mode, converted)
            })
            .collect();

        Ok(Styles(styles))
    }
}

/// Parse `"[modifiers] fg [on bg]"`, e.g. `"bold white on blue"`.
///
/// Colors accept anything ratatui understands: names, `#rrggbb` or a palette index.
pub fn parse_style(line: &str) -> Style {
    let lower = line.to_lowercase();
    let (foreground, background) = match lower.split_once("on ") {
        Some((fg, bg)) => (fg, Some(bg)),
        None => (lower.as_str(), None),
    };

    let mut style = Style::default();
    let mut modifiers = Modifier::empty();
    let mut color_words = Vec::new();
    for word in foreground.split_whitespace() {
        match word {
            "bold" => modifiers |= Modifier::BOLD,
            "italic" => modifiers |= Modifier::ITALIC,
            "underline" => modifiers |= Modifier::UNDERLINED,
            "inverse" => modifiers |= Modifier::REVERSED,
            "dim" => modifiers |= Modifier::DIM,
            color => color_words.push(color),
        }
    }
    if let Some(fg) = parse_color(&color_words.join(" ")) {
        style = style.fg(fg);
    }
    if let Some(bg) = background.and_then(parse_color) {
        style = style.bg(bg);
    }
    style.add_modifier(modifiers)
}

fn parse_color(s: &str) -> Option<Color> {
    let s = s.trim().replace("grey", "gray");
    if s.is_empty() {
        return None;
    }
    Color::from_str(&s).ok()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_embedded_config_parses() {
        let cfg = Config::embedded().unwrap();
        let quit = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(cfg.action_for_key(Mode::Global, quit), Some(Action::Quit));
        let slash = KeyEvent::new(KeyCode::Char('/'), KeyModifiers::empty());
        assert_eq!(cfg.action_for_key(Mode::QueryBar, slash), Some(Action::FocusQueryBar));
        assert_eq!(cfg.query.placeholder, "Search or filter results...");
        assert!(cfg.query.multi_value_keys.contains("tag"));
        assert!(cfg.query.initial.iter().all(|e| e.readonly));
    }

    #[test]
    fn test_embedded_schema_loads() {
        let cfg = Config::embedded().unwrap();
        let schema = cfg.load_schema().unwrap();
        assert!(!schema.groups.is_empty());
    }

    #[test]
    fn test_release_events_do_not_resolve() {
        let cfg = Config::embedded().unwrap();
        let mut key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        key.kind = KeyEventKind::Release;
        assert_eq!(cfg.action_for_key(Mode::Global, key), None);
    }

    #[test]
    fn test_user_file_overrides_only_its_keys() {
        let mut file = tempfile::Builder::new().suffix(".json5").tempfile().unwrap();
        write!(
            file,
            r#"{{ keybindings: {{ Global: {{ "<ctrl-q>": "Quit" }} }}, query: {{ placeholder: "Filter..." }} }}"#
        )
        .unwrap();
        let cfg = Config::from_path(Some(&file.path().to_path_buf())).unwrap();
        let ctrl_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(cfg.action_for_key(Mode::Global, ctrl_q), Some(Action::Quit));
        assert_eq!(cfg.action_for_key(Mode::Global, ctrl_c), Some(Action::Quit));
        assert_eq!(cfg.query.placeholder, "Filter...");
        assert_eq!(cfg.query.max_visible_options, 8);
    }

    #[test]
    fn test_key_for_action() {
        let cfg = Config::embedded().unwrap();
        assert_eq!(cfg.key_for_action(Mode::Global, &Action::CopyQuery), Some("ctrl-y".to_string()));
        assert_eq!(cfg.key_for_action(Mode::Global, &Action::Quit), Some("ctrl-c".to_string()));
        assert_eq!(cfg.key_for_action(Mode::QueryBar, &Action::Quit), None);
    }

    #[test]
    fn test_parse_style_default() {
        assert_eq!(parse_style(""), Style::default());
    }

    #[test]
    fn test_parse_style_foreground_and_background() {
        let style = parse_style("bold red on blue");
        assert_eq!(style.fg, Some(Color::Red));
        assert_eq!(style.bg, Some(Color::Blue));
        assert!(style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_parse_style_background_only() {
        let style = parse_style("on dark grey");
        assert_eq!(style.fg, None);
        assert_eq!(style.bg, Some(Color::DarkGray));
    }

    #[test]
    fn test_parse_color_unknown() {
        assert_eq!(parse_color("unknown"), None);
    }

    #[test]
    fn test_simple_keys() {
        assert_eq!(
            parse_key_event("a").unwrap(),
            KeyEvent::new(KeyCode::Char('a'), KeyModifiers::empty())
        );
        assert_eq!(
            parse_key_event("f1").unwrap(),
            KeyEvent::new(KeyCode::F(1), KeyModifiers::empty())
        );
        assert_eq!(
            parse_key_sequence("</>").unwrap(),
            vec![KeyEvent::new(KeyCode::Char('/'), KeyModifiers::empty())]
        );
    }

    #[test]
    fn test_multiple_modifiers_round_trip_to_string() {
        let key = parse_key_event("CTRL-alt-a").unwrap();
        assert_eq!(key, KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL | KeyModifiers::ALT));
        assert_eq!(key_event_to_string(&key), "ctrl-alt-a");
    }

    #[test]
    fn test_invalid_keys() {
        assert!(parse_key_event("invalid-key").is_err());
        assert!(parse_key_event("f13").is_err());
        assert!(parse_key_sequence("<ctrl-a").is_err());
    }

    #[test]
    fn test_invalid_binding_is_a_deserialize_error() {
        let result = json5::from_str::<Config>(r#"{ keybindings: { Global: { "<nope-nope>": "Quit" } } }"#);
        assert!(result.is_err());
    }
}
