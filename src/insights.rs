use std::str::FromStr;

/// Canned dashboard queries over the transaction star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insight {
    Daily,
    Merchants,
    Cards,
    Errors,
}

impl Insight {
    pub fn sql(&self) -> &'static str {
        match self {
            Insight::Daily => {
                "SELECT d.full_date, COUNT(*) AS transactions, SUM(f.amount) AS total \
                 FROM fact_transactions f \
                 JOIN dim_date d ON f.date_key = d.date_key \
                 GROUP BY d.full_date \
                 ORDER BY d.full_date DESC \
                 LIMIT 30"
            }
            Insight::Merchants => {
                "SELECT m.merchant_category_group, COUNT(*) AS count, SUM(f.amount) AS revenue \
                 FROM fact_transactions f \
                 JOIN dim_merchant m ON f.merchant_key = m.merchant_key \
                 GROUP BY m.merchant_category_group \
                 ORDER BY revenue DESC \
                 LIMIT 10"
            }
            Insight::Cards => {
                "SELECT c.card_brand, c.card_type, COUNT(*) AS usage_count, AVG(f.amount) AS avg_amount \
                 FROM fact_transactions f \
                 JOIN dim_card c ON f.card_key = c.card_key \
                 GROUP BY c.card_brand, c.card_type \
                 ORDER BY usage_count DESC"
            }
            Insight::Errors => {
                "SELECT f.error_code, COUNT(*) AS count \
                 FROM fact_transactions f \
                 WHERE f.has_errors = true \
                 GROUP BY f.error_code \
                 ORDER BY count DESC"
            }
        }
    }
}

impl FromStr for Insight {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Insight::Daily),
            "merchants" => Ok(Insight::Merchants),
            "cards" => Ok(Insight::Cards),
            "errors" => Ok(Insight::Errors),
            _ => Err(format!("Unknown insight type: {}", s)),
        }
    }
}
