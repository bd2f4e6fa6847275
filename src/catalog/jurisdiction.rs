use super::course::Course;

pub const JURISDICTIONS: [&str; 51] = [
    "Alabama", "Alaska", "Arizona", "Arkansas", "California", "Colorado", "Connecticut",
    "Delaware", "District of Columbia", "Florida", "Georgia", "Hawaii", "Idaho", "Illinois",
    "Indiana", "Iowa", "Kansas", "Kentucky", "Louisiana", "Maine", "Maryland", "Massachusetts",
    "Michigan", "Minnesota", "Mississippi", "Missouri", "Montana", "Nebraska", "Nevada",
    "New Hampshire", "New Jersey", "New Mexico", "New York", "North Carolina", "North Dakota",
    "Ohio", "Oklahoma", "Oregon", "Pennsylvania", "Rhode Island", "South Carolina",
    "South Dakota", "Tennessee", "Texas", "Utah", "Vermont", "Virginia", "Washington",
    "West Virginia", "Wisconsin", "Wyoming",
];

/// Case-insensitive substring test against a lowercased haystack.
/// Plain substring semantics: "Kansas" also hits "Arkansas".
pub fn mentions(haystack_lower: &str, jurisdiction: &str) -> bool {
    haystack_lower.contains(&jurisdiction.to_lowercase())
}

pub fn course_mentions_any(course: &Course, selected: &[String]) -> bool {
    let hay = course.haystack();
    selected.iter().any(|j| mentions(&hay, j))
}

/// The canonical spelling for a user-supplied jurisdiction name, if it is one.
pub fn canonical(name: &str) -> Option<&'static str> {
    JURISDICTIONS.iter().copied().find(|j| j.eq_ignore_ascii_case(name.trim()))
}
