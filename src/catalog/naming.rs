//! Story id and display-name derivation.

/// Separator between title levels in ids.
pub const ID_SEPARATOR: &str = "--";

/// Separator between title levels in display titles.
pub const LEVEL_SEPARATOR: &str = " / ";

/// Split an identifier into lowercase words.
///
/// Word boundaries are non-alphanumeric characters, lower→upper case
/// transitions, the end of an acronym (`HTMLButton` → `html`, `button`)
/// and letter↔digit transitions.
fn words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(char::is_lowercase))
                || (prev.is_alphabetic() && c.is_numeric())
                || (prev.is_numeric() && c.is_alphabetic());
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        }

        current.extend(c.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// `PrimaryButton` → `primary-button`.
#[must_use]
pub fn kebab_case(input: &str) -> String {
    words(input).join("-")
}

/// `primaryButton` → `Primary Button`.
#[must_use]
pub fn title_case(input: &str) -> String {
    words(input)
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// File id: the file name up to its first dot.
///
/// `src/button/primary.stories.tsx` → `primary`.
#[must_use]
pub fn file_id(file_path: &str) -> &str {
    let name = file_path.rsplit('/').next().unwrap_or(file_path);
    name.split('.').next().unwrap_or(name)
}

/// Title levels from an explicit `title` or, failing that, the file id.
#[must_use]
pub fn title_levels(explicit: Option<&str>, file_path: &str) -> Vec<String> {
    if let Some(title) = explicit {
        let levels: Vec<String> = title
            .split('/')
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .map(String::from)
            .collect();
        if !levels.is_empty() {
            return levels;
        }
    }
    vec![title_case(file_id(file_path))]
}

/// Story id from title levels and the story name.
#[must_use]
pub fn story_id(levels: &[String], name: &str) -> String {
    levels
        .iter()
        .map(|level| kebab_case(level))
        .chain(std::iter::once(kebab_case(name)))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(ID_SEPARATOR)
}
