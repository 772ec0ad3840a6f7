//! Selection of the ways that make up the street network.

use compare_osm_task_models::DEFAULT_EXCLUDED_HIGHWAYS;

/// Accepts ways tagged `highway=*` except for the excluded values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighwayFilter {
    excluded: Vec<String>,
}

impl Default for HighwayFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_HIGHWAYS)
    }
}

impl HighwayFilter {
    /// Creates a filter dropping the given `highway` values.
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    /// Excluded `highway` values.
    #[must_use]
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// Returns the `highway` value if a way with these tags is accepted.
    pub fn accepts<'a, I>(&self, tags: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let (_, highway) = tags.into_iter().find(|(key, _)| *key == "highway")?;
        if self.excluded.iter().any(|value| value == highway) {
            None
        } else {
            Some(highway)
        }
    }

    /// Overpass QL tag filters equivalent to [`Self::accepts`].
    #[must_use]
    pub fn overpass_clause(&self) -> String {
        let mut clause = String::from("[\"highway\"]");
        for value in &self.excluded {
            clause.push_str(&format!("[\"highway\"!=\"{}\"]", escape(value)));
        }
        clause
    }
}

/// Escapes a value for use inside a double-quoted Overpass QL string.
pub(crate) fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_drops_footways_and_cycleways() {
        let filter = HighwayFilter::default();
        assert_eq!(
            filter.accepts([("name", "Via Roma"), ("highway", "residential")]),
            Some("residential")
        );
        assert_eq!(filter.accepts([("highway", "footway")]), None);
        assert_eq!(filter.accepts([("highway", "cycleway")]), None);
    }

    #[test]
    fn ways_without_highway_tag_are_rejected() {
        let filter = HighwayFilter::default();
        assert_eq!(filter.accepts([("railway", "rail")]), None);
    }

    #[test]
    fn empty_exclusion_list_accepts_every_highway() {
        let filter = HighwayFilter::new(Vec::<String>::new());
        assert_eq!(filter.accepts([("highway", "footway")]), Some("footway"));
        assert_eq!(filter.overpass_clause(), "[\"highway\"]");
    }

    #[test]
    fn overpass_clause_lists_exclusions() {
        assert_eq!(
            HighwayFilter::default().overpass_clause(),
            "[\"highway\"][\"highway\"!=\"footway\"][\"highway\"!=\"cycleway\"]"
        );
    }

    #[test]
    fn escapes_quotes() {
        assert_eq!(escape("Sant\"Anna"), "Sant\\\"Anna");
    }
}
