//! Name helpers for qualified class names, case conversion and English
//! inflection.
//!
//! Qualified names use `\` as the namespace separator, matching the host
//! framework's class names (`App\Models\User`).

use convert_case::{Case, Casing};

/// Namespace separator used in qualified class names.
pub const SEPARATOR: char = '\\';

/// Short (unqualified) part of a class name: `App\Models\User` -> `User`.
pub fn short_name(qualified: &str) -> &str {
    let trimmed = qualified.trim_start_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Namespace part of a class name: `App\Models\User` -> `App\Models`.
///
/// Returns an empty string for names in the global namespace.
pub fn namespace_of(qualified: &str) -> &str {
    let trimmed = qualified.trim_start_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

/// Canonical form of a qualified name (no leading separator).
pub fn canonical(qualified: &str) -> String {
    qualified.trim().trim_start_matches(SEPARATOR).to_string()
}

/// Join a namespace and a short name.
pub fn qualify(namespace: &str, short: &str) -> String {
    let ns = namespace.trim_matches(SEPARATOR);
    if ns.is_empty() {
        short.to_string()
    } else {
        format!("{}{}{}", ns, SEPARATOR, short)
    }
}

/// Everything before the last occurrence of `needle`, or the whole string
/// when `needle` does not occur.
pub fn before_last<'a>(s: &'a str, needle: &str) -> &'a str {
    if needle.is_empty() {
        return s;
    }
    match s.rfind(needle) {
        Some(idx) => &s[..idx],
        None => s,
    }
}

pub fn studly(s: &str) -> String {
    s.to_case(Case::Pascal)
}

pub fn snake(s: &str) -> String {
    s.to_case(Case::Snake)
}

pub fn kebab(s: &str) -> String {
    s.to_case(Case::Kebab)
}

/// Lower-case the first character only: `Active` -> `active`.
pub fn lcfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upper-case the first character only: `active` -> `Active`.
pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Guessed model class short name for a table: `order_items` -> `OrderItem`.
pub fn model_name_for_table(table: &str) -> String {
    studly(&singular(table))
}

/// Conventional table name for a model short name: `UserProfile` -> `user_profiles`.
pub fn table_name_for_model(short: &str) -> String {
    snake(&plural(short))
}

static UNCOUNTABLE: phf::Set<&'static str> = phf::phf_set! {
    "audio", "data", "equipment", "feedback", "fish", "information",
    "metadata", "money", "news", "rice", "series", "sheep", "species",
    "staff",
};

/// Irregular (singular, plural) pairs.
const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("foot", "feet"),
    ("goose", "geese"),
    ("man", "men"),
    ("mouse", "mice"),
    ("person", "people"),
    ("tooth", "teeth"),
    ("woman", "women"),
];

/// Plurals the suffix rules get wrong: `-ves` words that really end in `f`
/// or `fe`, and `-ches`/`-shes` words whose singular keeps the `e`.
static SINGULAR_EXCEPTIONS: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "calves" => "calf",
    "elves" => "elf",
    "halves" => "half",
    "knives" => "knife",
    "leaves" => "leaf",
    "lives" => "life",
    "loaves" => "loaf",
    "scarves" => "scarf",
    "selves" => "self",
    "shelves" => "shelf",
    "thieves" => "thief",
    "wives" => "wife",
    "wolves" => "wolf",
    "avalanches" => "avalanche",
    "caches" => "cache",
    "headaches" => "headache",
    "moustaches" => "moustache",
    "niches" => "niche",
    "quiches" => "quiche",
};

/// `statuses`, `buses`, `campuses`; not `houses` or `causes`.
fn is_us_plural(lower: &str) -> bool {
    match lower.strip_suffix("uses") {
        Some(stem) => stem
            .chars()
            .last()
            .map(|c| !"aeiou".contains(c))
            .unwrap_or(true),
        None => false,
    }
}

/// Split a word into a prefix and its last lower-case word so inflection only
/// touches the tail: `order_items` -> (`order_`, `items`), `UserProfile` ->
/// (`User`, `Profile`).
fn split_tail(word: &str) -> (&str, &str) {
    let boundary = word
        .char_indices()
        .rev()
        .find(|(i, c)| *c == '_' || *c == '-' || (c.is_uppercase() && *i > 0))
        .map(|(i, c)| if c == '_' || c == '-' { i + 1 } else { i })
        .unwrap_or(0);
    word.split_at(boundary)
}

/// Re-apply the capitalisation of `template` to `word`.
fn match_case(template: &str, word: &str) -> String {
    if template.chars().next().map(char::is_uppercase).unwrap_or(false) {
        ucfirst(word)
    } else {
        word.to_string()
    }
}

/// Singular form of an English noun (last word only).
pub fn singular(word: &str) -> String {
    let (head, tail) = split_tail(word);
    if tail.is_empty() {
        return word.to_string();
    }
    let lower = tail.to_lowercase();

    if UNCOUNTABLE.contains(lower.as_str()) {
        return word.to_string();
    }
    if let Some((single, _)) = IRREGULAR.iter().find(|(_, p)| *p == lower) {
        return format!("{}{}", head, match_case(tail, single));
    }
    if IRREGULAR.iter().any(|(s, _)| *s == lower) {
        return word.to_string();
    }

    let stem = if let Some(stem) = lower.strip_suffix("ies") {
        if stem.len() > 1 {
            format!("{}y", stem)
        } else {
            lower.trim_end_matches('s').to_string()
        }
    } else if let Some(single) = SINGULAR_EXCEPTIONS.get(lower.as_str()) {
        single.to_string()
    } else if lower.ends_with("sses")
        || lower.ends_with("shes")
        || lower.ends_with("ches")
        || lower.ends_with("xes")
        || lower.ends_with("zes")
        || is_us_plural(&lower)
    {
        lower[..lower.len() - 2].to_string()
    } else if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        lower.clone()
    } else if let Some(stem) = lower.strip_suffix('s') {
        stem.to_string()
    } else {
        lower.clone()
    };

    format!("{}{}", head, match_case(tail, &stem))
}

/// Plural form of an English noun (last word only).
pub fn plural(word: &str) -> String {
    let (head, tail) = split_tail(word);
    if tail.is_empty() {
        return word.to_string();
    }
    let lower = tail.to_lowercase();

    if UNCOUNTABLE.contains(lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, many)) = IRREGULAR.iter().find(|(s, _)| *s == lower) {
        return format!("{}{}", head, match_case(tail, many));
    }

    let ends_consonant_y = lower.ends_with('y')
        && !lower
            .chars()
            .rev()
            .nth(1)
            .map(|c| "aeiou".contains(c))
            .unwrap_or(true);

    let many = if ends_consonant_y {
        format!("{}ies", &lower[..lower.len() - 1])
    } else if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        format!("{}es", lower)
    } else {
        format!("{}s", lower)
    };

    format!("{}{}", head, match_case(tail, &many))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_and_namespace() {
        assert_eq!(short_name("App\\Models\\User"), "User");
        assert_eq!(short_name("\\App\\Models\\User"), "User");
        assert_eq!(short_name("User"), "User");
        assert_eq!(namespace_of("App\\Models\\User"), "App\\Models");
        assert_eq!(namespace_of("User"), "");
        assert_eq!(qualify("App\\Models", "Post"), "App\\Models\\Post");
        assert_eq!(qualify("", "Post"), "Post");
    }

    #[test]
    fn test_singular() {
        assert_eq!(singular("posts"), "post");
        assert_eq!(singular("categories"), "category");
        assert_eq!(singular("addresses"), "address");
        assert_eq!(singular("statuses"), "status");
        assert_eq!(singular("people"), "person");
        assert_eq!(singular("order_items"), "order_item");
        assert_eq!(singular("Users"), "User");
        assert_eq!(singular("news"), "news");
        assert_eq!(singular("buses"), "bus");
    }

    #[test]
    fn test_singular_table_names() {
        assert_eq!(singular("archives"), "archive");
        assert_eq!(singular("warehouses"), "warehouse");
        assert_eq!(singular("houses"), "house");
        assert_eq!(singular("causes"), "cause");
        assert_eq!(singular("caches"), "cache");
        assert_eq!(singular("drives"), "drive");
        assert_eq!(singular("leaves"), "leaf");
        assert_eq!(singular("knives"), "knife");
        assert_eq!(singular("batches"), "batch");
        assert_eq!(singular("wishes"), "wish");
        assert_eq!(model_name_for_table("warehouses"), "Warehouse");
        assert_eq!(model_name_for_table("file_archives"), "FileArchive");
        assert_eq!(model_name_for_table("caches"), "Cache");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural("post"), "posts");
        assert_eq!(plural("category"), "categories");
        assert_eq!(plural("day"), "days");
        assert_eq!(plural("box"), "boxes");
        assert_eq!(plural("UserProfile"), "UserProfiles");
        assert_eq!(plural("Person"), "People");
    }

    #[test]
    fn test_table_model_guessing() {
        assert_eq!(model_name_for_table("posts"), "Post");
        assert_eq!(model_name_for_table("order_items"), "OrderItem");
        assert_eq!(table_name_for_model("UserProfile"), "user_profiles");
        assert_eq!(table_name_for_model("Category"), "categories");
    }

    #[test]
    fn test_before_last() {
        assert_eq!(before_last("PostResource", "Resource"), "Post");
        assert_eq!(before_last("Post", "Resource"), "Post");
    }
}
