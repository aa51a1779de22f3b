use pitchside_api::{FieldSize, Match, MatchType, SkillLevel, Stadium};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Distance,
    Price,
    Rating,
}

impl SortBy {
    pub fn next(self) -> Self {
        match self {
            SortBy::Distance => SortBy::Price,
            SortBy::Price => SortBy::Rating,
            SortBy::Rating => SortBy::Distance,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortBy::Distance => "distance",
            SortBy::Price => "price",
            SortBy::Rating => "rating",
        }
    }
}

/// Stadium search filters. Replaced wholesale on every application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StadiumFilters {
    pub field_size: Option<FieldSize>,
    pub max_price: Option<u32>,
    pub max_distance: Option<f64>,
    pub sort_by: SortBy,
}

impl StadiumFilters {
    pub fn is_active(&self) -> bool {
        self.field_size.is_some() || self.max_price.is_some() || self.max_distance.is_some()
    }

    fn accepts(&self, stadium: &Stadium) -> bool {
        self.field_size.is_none_or(|size| stadium.field_size == size)
            && self.max_price.is_none_or(|max| stadium.price_per_hour <= max)
            && self.max_distance.is_none_or(|max| stadium.distance <= max)
    }
}

/// Filter then sort a copy of `stadiums`; the input is never touched.
/// Sorting is stable, so ties keep their distance order.
pub fn apply_filters(stadiums: &[Stadium], filters: &StadiumFilters) -> Vec<Stadium> {
    let mut out: Vec<Stadium> = stadiums.iter().filter(|s| filters.accepts(s)).cloned().collect();
    match filters.sort_by {
        SortBy::Distance => out.sort_by(|a, b| a.distance.total_cmp(&b.distance)),
        SortBy::Price => out.sort_by_key(|s| s.price_per_hour),
        SortBy::Rating => out.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
    }
    out
}

/// Chips on the match list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchFilters {
    pub skill_level: Option<SkillLevel>,
    pub match_type: Option<MatchType>,
}

impl MatchFilters {
    pub fn is_active(&self) -> bool {
        self.skill_level.is_some() || self.match_type.is_some()
    }
}

pub fn filter_matches(matches: &[Match], filters: &MatchFilters) -> Vec<Match> {
    matches
        .iter()
        .filter(|m| filters.skill_level.is_none_or(|level| m.skill_level == level))
        .filter(|m| filters.match_type.is_none_or(|kind| m.match_type() == kind))
        .cloned()
        .collect()
}
