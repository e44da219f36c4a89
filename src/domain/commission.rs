use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Agent rank, determining the agent's cut of the agency commission.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentTier {
    #[default]
    Advisor,
    SalesLeader,
    TeamLeader,
    GroupLeader,
    SupremeLeader,
}

impl AgentTier {
    /// Resolves a tier from its display name. Unknown names fall back to
    /// `Advisor`, the lowest percentage.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "Advisor" => Self::Advisor,
            "Sales Leader" => Self::SalesLeader,
            "Team Leader" => Self::TeamLeader,
            "Group Leader" => Self::GroupLeader,
            "Supreme Leader" => Self::SupremeLeader,
            _ => Self::Advisor,
        }
    }

    /// Percentage of the agency commission kept by the agent.
    pub fn agent_percentage(&self) -> Decimal {
        let pct: u32 = match self {
            Self::Advisor => 70,
            Self::SalesLeader => 80,
            Self::TeamLeader => 83,
            Self::GroupLeader | Self::SupremeLeader => 85,
        };
        Decimal::from(pct)
    }
}

/// Co-broking terms attached to a transaction. The split is our agency's
/// percentage of the total commission; callers clamp it to [1, 99] before
/// it reaches the calculator.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Default)]
pub struct CoBrokingTerms {
    pub enabled: bool,
    pub commission_split: Option<Decimal>,
}

impl CoBrokingTerms {
    pub const DEFAULT_SPLIT: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

    pub fn split(&self) -> Decimal {
        self.commission_split.unwrap_or(Self::DEFAULT_SPLIT)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CommissionInput {
    pub transaction_value: Decimal,
    pub commission_rate: Decimal,
    pub agent_tier: AgentTier,
    pub co_broking: CoBrokingTerms,
}

/// Full commission breakdown, echoing the inputs it was derived from so
/// the result is auditable on its own.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CommissionBreakdown {
    pub total_commission: Decimal,
    pub our_agency_commission: Decimal,
    pub co_agency_commission: Option<Decimal>,
    pub agent_share: Decimal,
    pub agency_share: Decimal,
    pub agent_tier: AgentTier,
    pub agent_percentage: Decimal,
    pub transaction_value: Decimal,
    pub commission_rate: Decimal,
    pub co_broking_split: Option<Decimal>,
}

/// Computes the commission breakdown for a transaction.
///
/// Pure and deterministic; this is the single source of truth for every
/// commission figure the engine persists or previews. Complements are
/// derived by subtraction so the halves always sum back to the whole.
pub fn calculate(input: &CommissionInput) -> CommissionBreakdown {
    let total_commission = input.transaction_value * input.commission_rate / HUNDRED;
    let agent_pct = input.agent_tier.agent_percentage();

    let (our_agency_commission, co_agency_commission, co_broking_split) = if input.co_broking.enabled
    {
        let split = input.co_broking.split();
        let ours = total_commission * split / HUNDRED;
        (ours, Some(total_commission - ours), Some(split))
    } else {
        (total_commission, None, None)
    };

    let agent_share = our_agency_commission * agent_pct / HUNDRED;
    let agency_share = our_agency_commission - agent_share;

    CommissionBreakdown {
        total_commission,
        our_agency_commission,
        co_agency_commission,
        agent_share,
        agency_share,
        agent_tier: input.agent_tier,
        agent_percentage: agent_pct,
        transaction_value: input.transaction_value,
        commission_rate: input.commission_rate,
        co_broking_split,
    }
}

/// Rounds a monetary amount to cents for persistence and display.
/// Normalized so equal amounts always render identically.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp(2).normalize()
}
