use crate::model::SearchFilters;

/// Qualify the caller's query for one repository
///
/// `"{query} language:{l} extension:{e} repo:{full_name}"`; blank filters are
/// omitted and a leading `.` on the extension is dropped.
pub fn build_scoped_query(query: &str, filters: &SearchFilters, full_name: &str) -> String {
    let mut parts = vec![query.trim().to_string()];

    if let Some(language) = non_blank(filters.language.as_deref()) {
        parts.push(format!("language:{language}"));
    }
    if let Some(extension) = non_blank(filters.extension.as_deref())
        .map(|extension| extension.trim_start_matches('.'))
        .filter(|extension| !extension.is_empty())
    {
        parts.push(format!("extension:{extension}"));
    }
    parts.push(format!("repo:{full_name}"));

    parts.join(" ")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
