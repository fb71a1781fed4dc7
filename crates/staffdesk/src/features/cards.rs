use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::blank_date;
use crate::data::entity::{CompanyId, Draft, Entity, RecordId};
use crate::data::store::Direction;
use crate::views::form::RequiredFields;

/// Utilization above which a card is flagged in the overview.
pub const NEAR_LIMIT_THRESHOLD: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Active,
    Blocked,
    Expired,
}

impl CardStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
            Self::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyCard {
    pub id: RecordId,
    pub company_id: CompanyId,
    pub card_name: String,
    pub holder_name: String,
    #[serde(default)]
    pub holder_id: Option<RecordId>,
    pub last_four: String,
    #[serde(default)]
    pub card_type: Option<String>,
    pub monthly_limit: f64,
    #[serde(default)]
    pub current_balance: f64,
    pub status: CardStatus,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl CompanyCard {
    pub fn masked_number(&self) -> String {
        format!("**** **** **** {}", self.last_four)
    }

    pub fn usage(&self) -> CardUsage {
        let remaining = (self.monthly_limit - self.current_balance).max(0.0);
        let utilization_pct = if self.monthly_limit > 0.0 {
            (self.current_balance / self.monthly_limit * 100.0).max(0.0)
        } else {
            0.0
        };

        CardUsage {
            card_id: self.id.clone(),
            card_name: self.card_name.clone(),
            holder_name: self.holder_name.clone(),
            masked_number: self.masked_number(),
            monthly_limit: self.monthly_limit,
            current_balance: self.current_balance,
            remaining,
            utilization_pct,
            near_limit: utilization_pct > NEAR_LIMIT_THRESHOLD,
        }
    }
}

impl Entity for CompanyCard {
    const TABLE: &'static str = "company_cards";
    const LABEL: &'static str = "company cards";
    const ORDER_BY: (&'static str, Direction) = ("card_name", Direction::Ascending);

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.card_name.as_str(),
            self.holder_name.as_str(),
            self.last_four.as_str(),
        ]
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyCardDraft {
    pub card_name: Option<String>,
    pub holder_name: Option<String>,
    pub holder_id: Option<RecordId>,
    pub last_four: Option<String>,
    pub card_type: Option<String>,
    pub monthly_limit: Option<f64>,
    pub current_balance: Option<f64>,
    pub status: Option<CardStatus>,
    #[serde(deserialize_with = "blank_date")]
    pub expiry_date: Option<NaiveDate>,
}

impl Draft for CompanyCardDraft {
    type Record = CompanyCard;
    const DEFAULT_STATUS: Option<&'static str> = Some("active");

    fn required(&self) -> RequiredFields {
        RequiredFields::new()
            .text("card_name", self.card_name.as_deref())
            .text("holder_name", self.holder_name.as_deref())
            .text("last_four", self.last_four.as_deref())
            .number("monthly_limit", self.monthly_limit)
    }

    fn derive(&self, row: &mut crate::data::store::Row) {
        if self.current_balance.is_none() {
            row.insert("current_balance".to_string(), serde_json::json!(0.0));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardUsage {
    pub card_id: RecordId,
    pub card_name: String,
    pub holder_name: String,
    pub masked_number: String,
    pub monthly_limit: f64,
    pub current_balance: f64,
    pub remaining: f64,
    pub utilization_pct: f64,
    pub near_limit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardPortfolio {
    pub total_limit: f64,
    pub total_balance: f64,
    pub active_cards: usize,
    pub near_limit: usize,
    pub cards: Vec<CardUsage>,
}

impl CardPortfolio {
    pub fn from_cards(cards: &[CompanyCard]) -> Self {
        let usage: Vec<CardUsage> = cards.iter().map(CompanyCard::usage).collect();

        Self {
            total_limit: cards.iter().map(|card| card.monthly_limit).sum(),
            total_balance: cards.iter().map(|card| card.current_balance).sum(),
            active_cards: cards
                .iter()
                .filter(|card| card.status == CardStatus::Active)
                .count(),
            near_limit: usage.iter().filter(|card| card.near_limit).count(),
            cards: usage,
        }
    }
}
