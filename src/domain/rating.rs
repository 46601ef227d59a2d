use std::fmt;
use std::str::FromStr;

use crate::app::DigestError;

/// A member rating in half-star steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rating {
    Half,
    One,
    OneAndHalf,
    Two,
    TwoAndHalf,
    Three,
    ThreeAndHalf,
    Four,
    FourAndHalf,
    Five,
}

/// Custom emoji shown next to an entry, with the plain emoji clients fall
/// back to when they cannot render the custom one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingEmoji {
    pub document_id: i64,
    pub fallback: &'static str,
}

impl RatingEmoji {
    pub fn markup(&self) -> String {
        format!(
            "<tg-emoji emoji-id=\"{}\">{}</tg-emoji>",
            self.document_id, self.fallback
        )
    }
}

/// Whether a rating is strong enough to deserve a meme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Loved,
    Hated,
}

pub const UNRATED_EMOJI: RatingEmoji = RatingEmoji {
    document_id: 5433986691549387917,
    fallback: "😋",
};

struct RatingRow {
    rating: Rating,
    value: &'static str,
    stars: &'static str,
    emoji: RatingEmoji,
}

const fn row(
    rating: Rating,
    value: &'static str,
    stars: &'static str,
    document_id: i64,
    fallback: &'static str,
) -> RatingRow {
    RatingRow {
        rating,
        value,
        stars,
        emoji: RatingEmoji {
            document_id,
            fallback,
        },
    }
}

const RATING_TABLE: [RatingRow; 10] = [
    row(Rating::Half, "0.5", "½★", 5436167151956284338, "🖕"),
    row(Rating::One, "1.0", "★", 5434146580296913175, "🤓"),
    row(Rating::OneAndHalf, "1.5", "★½", 5433905855969906170, "😁"),
    row(Rating::Two, "2.0", "★★", 5435946807249099970, "🚬"),
    row(Rating::TwoAndHalf, "2.5", "★★½", 5434010992474349724, "😐"),
    row(Rating::Three, "3.0", "★★★", 5435893352086136461, "🐱"),
    row(Rating::ThreeAndHalf, "3.5", "★★★½", 5435908904162713385, "🎧"),
    row(Rating::Four, "4.0", "★★★★", 5435881665480119374, "😳"),
    row(Rating::FourAndHalf, "4.5", "★★★★½", 5436196100035862776, "😭"),
    row(Rating::Five, "5.0", "★★★★★", 5435974213435415251, "🤯"),
];

impl Rating {
    fn row(self) -> &'static RatingRow {
        &RATING_TABLE[self as usize]
    }

    pub fn stars(self) -> &'static str {
        self.row().stars
    }

    pub fn emoji(self) -> RatingEmoji {
        self.row().emoji
    }

    /// The feed's textual form, e.g. `"3.5"`.
    pub fn as_str(self) -> &'static str {
        self.row().value
    }

    pub fn sentiment(self) -> Option<Sentiment> {
        match self {
            Rating::FourAndHalf | Rating::Five => Some(Sentiment::Loved),
            Rating::Half | Rating::One => Some(Sentiment::Hated),
            _ => None,
        }
    }
}

/// Emoji for an optional rating, using the unrated entry for `None`.
pub fn emoji_for(rating: Option<Rating>) -> RatingEmoji {
    rating.map_or(UNRATED_EMOJI, Rating::emoji)
}

impl FromStr for Rating {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        RATING_TABLE
            .iter()
            .find(|row| row.value == s)
            .map(|row| row.rating)
            .ok_or_else(|| DigestError::InvalidRating(s.to_string()))
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
