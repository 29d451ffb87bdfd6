use serde::{Deserialize, Serialize};

pub mod schema;
pub mod validate;

pub use validate::{parse_report, SchemaViolation};

/// Atomic unit of evaluation produced by the analysis model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeoFactor {
    /// Score within `0..=100`.
    pub score: u8,
    pub analysis: String,
    pub recommendation: String,
}

impl SeoFactor {
    pub const FIELDS: &'static [&'static str] = &["score", "analysis", "recommendation"];
}

/// Declares a category group: a struct whose fields are the group's fixed factor keys,
/// in the order they are rendered and exported.
macro_rules! category_group {
    ($(#[$meta:meta])* $name:ident { $($field:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $name {
            $(
                #[serde(rename = $key)]
                pub $field: SeoFactor,
            )+
        }

        impl $name {
            /// Factor keys as they appear on the wire.
            pub const KEYS: &'static [&'static str] = &[$($key),+];

            /// Factors paired with their wire keys, in declaration order.
            pub fn factors(&self) -> Vec<(&'static str, &SeoFactor)> {
                vec![$(($key, &self.$field)),+]
            }
        }
    };
}

category_group!(
    /// On-page signals: titles, descriptions, headings, copy and images.
    OnPageSeo {
        title_tag => "titleTag",
        meta_description => "metaDescription",
        headings => "headings",
        content_quality => "contentQuality",
        keyword_usage => "keywordUsage",
        image_seo => "imageSeo",
    }
);

category_group!(
    /// Crawlability and infrastructure signals.
    TechnicalSeo {
        mobile_friendliness => "mobileFriendliness",
        url_structure => "urlStructure",
        schema_markup => "schemaMarkup",
        https_redirect => "httpsRedirect",
        robots_txt => "robotsTxt",
    }
);

category_group!(
    PerformanceSeo {
        core_web_vitals => "coreWebVitals",
        site_speed => "siteSpeed",
        asset_optimization => "assetOptimization",
        caching_policy => "cachingPolicy",
    }
);

category_group!(
    Backlinks {
        backlink_profile_strength => "backlinkProfileStrength",
        domain_authority_estimation => "domainAuthorityEstimation",
    }
);

category_group!(
    SocialPresence {
        social_links => "socialLinks",
        open_graph_tags => "openGraphTags",
    }
);

/// The five audit pillars, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    OnPage,
    Technical,
    Performance,
    Backlinks,
    Social,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 5] = [
        CategoryKind::OnPage,
        CategoryKind::Technical,
        CategoryKind::Performance,
        CategoryKind::Backlinks,
        CategoryKind::Social,
    ];

    /// Field name of the group inside the report payload.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::OnPage => "onPageSeo",
            Self::Technical => "technicalSeo",
            Self::Performance => "performanceSeo",
            Self::Backlinks => "backlinks",
            Self::Social => "socialPresence",
        }
    }

    /// Short label used for the radar axis.
    pub fn axis_label(self) -> &'static str {
        match self {
            Self::OnPage => "On-Page",
            Self::Technical => "Technical",
            Self::Performance => "Performance",
            Self::Backlinks => "Backlinks",
            Self::Social => "Social",
        }
    }

    /// Section heading used by the renderer and the tabular export.
    pub fn title(self) -> &'static str {
        match self {
            Self::OnPage => "On-Page SEO",
            Self::Technical => "Technical SEO",
            Self::Performance => "Performance",
            Self::Backlinks => "Backlinks",
            Self::Social => "Social Presence",
        }
    }

    pub fn factor_keys(self) -> &'static [&'static str] {
        match self {
            Self::OnPage => OnPageSeo::KEYS,
            Self::Technical => TechnicalSeo::KEYS,
            Self::Performance => PerformanceSeo::KEYS,
            Self::Backlinks => Backlinks::KEYS,
            Self::Social => SocialPresence::KEYS,
        }
    }
}

/// Priority attached to a top-level recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|priority| priority.as_str() == value)
    }
}

/// Ranked action item. Position in the containing list is the ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recommendation {
    pub text: String,
    pub priority: Priority,
    pub category: String,
}

impl Recommendation {
    pub const FIELDS: &'static [&'static str] = &["text", "priority", "category"];
}

/// Aggregate root of one audit, built in one step from a validated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeoReportData {
    /// Supplied by the model; not reconciled with the category averages.
    pub overall_score: u8,
    pub on_page_seo: OnPageSeo,
    pub technical_seo: TechnicalSeo,
    pub performance_seo: PerformanceSeo,
    pub backlinks: Backlinks,
    pub social_presence: SocialPresence,
    pub recommendations: Vec<Recommendation>,
}

impl SeoReportData {
    /// Top-level payload fields, in schema order.
    pub const FIELDS: &'static [&'static str] = &[
        "overallScore",
        "onPageSeo",
        "technicalSeo",
        "performanceSeo",
        "backlinks",
        "socialPresence",
        "recommendations",
    ];

    /// Factors of one group paired with their keys.
    pub fn factors(&self, kind: CategoryKind) -> Vec<(&'static str, &SeoFactor)> {
        match kind {
            CategoryKind::OnPage => self.on_page_seo.factors(),
            CategoryKind::Technical => self.technical_seo.factors(),
            CategoryKind::Performance => self.performance_seo.factors(),
            CategoryKind::Backlinks => self.backlinks.factors(),
            CategoryKind::Social => self.social_presence.factors(),
        }
    }

    /// Every group with its factors, in display order.
    pub fn categories(&self) -> Vec<(CategoryKind, Vec<(&'static str, &SeoFactor)>)> {
        CategoryKind::ALL
            .into_iter()
            .map(|kind| (kind, self.factors(kind)))
            .collect()
    }
}
