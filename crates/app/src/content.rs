//! Static landing page copy.
//!
//! Everything the page shows around the upload section, as serializable
//! data so any front end can render it.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Hero {
    pub logo: &'static str,
    pub logo_alt: &'static str,
    pub background_video: &'static str,
    pub headline: &'static str,
    pub cta_label: &'static str,
    pub cta_note: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryItem {
    pub id: u32,
    pub image: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrustStat {
    pub value: &'static str,
    pub label: &'static str,
    pub show_star: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityFeature {
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FooterColumn {
    pub heading: &'static str,
    pub links: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct Footer {
    pub columns: &'static [FooterColumn],
    pub social_heading: &'static str,
    pub social: &'static [&'static str],
    pub brand: &'static str,
}

/// Full page content.
#[derive(Debug, Clone, Serialize)]
pub struct PageContent {
    pub hero: Hero,
    pub gallery: &'static [GalleryItem],
    pub stats: &'static [TrustStat],
    pub features: &'static [SecurityFeature],
    pub footer: Footer,
}

pub const HERO: Hero = Hero {
    logo: "/Kyclogo.png",
    logo_alt: "KissYourCrush Logo",
    background_video: "/bg.mp4",
    headline: "Wanna kiss your fantasy crush ?",
    cta_label: "Try It Free",
    cta_note: "Trial applicable for 1 output",
};

pub const GALLERY: &[GalleryItem] = &[
    GalleryItem {
        id: 1,
        image: "https://images.unsplash.com/photo-1516589178581-6cd7833ae3b2?w=800",
    },
    GalleryItem {
        id: 2,
        image: "https://images.unsplash.com/photo-1622495966027-e0173192c728?w=800",
    },
    GalleryItem {
        id: 3,
        image: "https://images.unsplash.com/photo-1518991669955-9c7e78ec80ca?w=800",
    },
    GalleryItem {
        id: 4,
        image: "https://images.unsplash.com/photo-1516589178581-6cd7833ae3b2?w=800",
    },
    GalleryItem {
        id: 5,
        image: "https://images.unsplash.com/photo-1622495966027-e0173192c728?w=800",
    },
];

/// Gallery item shown first.
pub const GALLERY_INITIAL_INDEX: usize = 1;

pub const STATS: &[TrustStat] = &[
    TrustStat {
        value: "95%",
        label: "Ai Accuracy",
        show_star: false,
    },
    TrustStat {
        value: "<500s",
        label: "Generation Speed",
        show_star: false,
    },
    TrustStat {
        value: "4.2",
        label: "User Rating",
        show_star: true,
    },
    TrustStat {
        value: "1K+",
        label: "Daily Users",
        show_star: false,
    },
];

pub const FEATURES: &[SecurityFeature] = &[
    SecurityFeature {
        title: "100% Private Processing",
        description: "Your photos are processed securely and never stored",
    },
    SecurityFeature {
        title: "Bank Level Security",
        description: "Enterprise-grade encryption for all uploads",
    },
    SecurityFeature {
        title: "Instant Photo Deletion",
        description: "All photos are permanently deleted after processing",
    },
];

pub const FOOTER: Footer = Footer {
    columns: &[
        FooterColumn {
            heading: "Legal",
            links: &["Privacy Policy", "Terms of Service"],
        },
        FooterColumn {
            heading: "Support",
            links: &["FAQ", "Contact"],
        },
    ],
    social_heading: "Connect With Us",
    social: &["Instagram", "Twitter", "Facebook", "Mail"],
    brand: "KissMyKrush",
};

/// The landing page.
pub fn page() -> PageContent {
    PageContent {
        hero: HERO,
        gallery: GALLERY,
        stats: STATS,
        features: FEATURES,
        footer: FOOTER,
    }
}

/// Footer copyright line for `year`.
pub fn copyright(year: i32) -> String {
    format!("\u{a9} {year} {}. All rights reserved.", FOOTER.brand)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_serializes_to_json() {
        let json = serde_json::to_value(page()).unwrap();
        assert_eq!(json["hero"]["headline"], "Wanna kiss your fantasy crush ?");
        assert_eq!(json["stats"].as_array().unwrap().len(), 4);
        assert_eq!(json["stats"][2]["show_star"], true);
        assert_eq!(json["features"][2]["title"], "Instant Photo Deletion");
        assert_eq!(json["footer"]["columns"][1]["links"][0], "FAQ");
    }

    #[test]
    fn gallery_start_is_in_range() {
        assert!(GALLERY_INITIAL_INDEX < GALLERY.len());
    }

    #[test]
    fn copyright_names_brand_and_year() {
        assert_eq!(copyright(2025), "\u{a9} 2025 KissMyKrush. All rights reserved.");
    }
}
