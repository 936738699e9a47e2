use crate::metrics::SummaryMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//statistic a parameter sweep maximizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    ReturnPct,
    EquityFinal,
    SharpeRatio,
    SortinoRatio,
    CalmarRatio,
    WinRatePct,
    ProfitFactor,
    ExpectancyPct,
    Sqn,

    //ranks by the negated drawdown so shallower is better
    MaxDrawdownPct,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::ReturnPct,
        Metric::EquityFinal,
        Metric::SharpeRatio,
        Metric::SortinoRatio,
        Metric::CalmarRatio,
        Metric::WinRatePct,
        Metric::ProfitFactor,
        Metric::ExpectancyPct,
        Metric::Sqn,
        Metric::MaxDrawdownPct,
    ];

    //score to maximize
    pub fn value(&self, summary: &SummaryMetrics) -> f64 {
        match self {
            Metric::ReturnPct => summary.return_pct,
            Metric::EquityFinal => summary.equity_final,
            Metric::SharpeRatio => summary.sharpe_ratio,
            Metric::SortinoRatio => summary.sortino_ratio,
            Metric::CalmarRatio => summary.calmar_ratio,
            Metric::WinRatePct => summary.win_rate_pct,
            Metric::ProfitFactor => summary.profit_factor,
            Metric::ExpectancyPct => summary.expectancy_pct,
            Metric::Sqn => summary.sqn,
            Metric::MaxDrawdownPct => -summary.max_drawdown_pct,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::ReturnPct => "return_pct",
            Metric::EquityFinal => "equity_final",
            Metric::SharpeRatio => "sharpe_ratio",
            Metric::SortinoRatio => "sortino_ratio",
            Metric::CalmarRatio => "calmar_ratio",
            Metric::WinRatePct => "win_rate_pct",
            Metric::ProfitFactor => "profit_factor",
            Metric::ExpectancyPct => "expectancy_pct",
            Metric::Sqn => "sqn",
            Metric::MaxDrawdownPct => "max_drawdown_pct",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        let alias = match key.as_str() {
            "return" => Some(Metric::ReturnPct),
            "equity" => Some(Metric::EquityFinal),
            "sharpe" => Some(Metric::SharpeRatio),
            "sortino" => Some(Metric::SortinoRatio),
            "calmar" => Some(Metric::CalmarRatio),
            "win_rate" => Some(Metric::WinRatePct),
            "expectancy" => Some(Metric::ExpectancyPct),
            "drawdown" | "max_drawdown" => Some(Metric::MaxDrawdownPct),
            _ => None,
        };
        alias
            .or_else(|| Metric::ALL.into_iter().find(|m| m.name() == key))
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("return".parse::<Metric>(), Ok(Metric::ReturnPct));
        assert_eq!("Sharpe".parse::<Metric>(), Ok(Metric::SharpeRatio));
        assert_eq!("profit-factor".parse::<Metric>(), Ok(Metric::ProfitFactor));
        assert_eq!("max_drawdown_pct".parse::<Metric>(), Ok(Metric::MaxDrawdownPct));
        assert!("alpha".parse::<Metric>().is_err());
    }

    #[test]
    fn names_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.name().parse::<Metric>(), Ok(metric));
            assert_eq!(metric.to_string(), metric.name());
        }
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&Metric::SharpeRatio).unwrap(), "\"sharpe_ratio\"");
        let parsed: Metric = serde_json::from_str("\"return_pct\"").unwrap();
        assert_eq!(parsed, Metric::ReturnPct);
    }
}
