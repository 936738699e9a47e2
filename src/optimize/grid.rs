use crate::config::RsiParams;
use crate::optimize::SweepError;
use serde::{Deserialize, Serialize};

//candidate values for each swept parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub lookbacks: Vec<usize>,
    pub overboughts: Vec<f64>,
    pub oversolds: Vec<f64>,
    pub risk_rewards: Vec<f64>,
}

impl ParamGrid {
    //a grid holding exactly the given parameter set
    pub fn single(params: &RsiParams) -> Self {
        ParamGrid {
            lookbacks: vec![params.lookback],
            overboughts: vec![params.overbought],
            oversolds: vec![params.oversold],
            risk_rewards: vec![params.risk_reward],
        }
    }

    //returns the total number of combinations
    pub fn size(&self) -> usize {
        self.lookbacks.len() * self.overboughts.len() * self.oversolds.len() * self.risk_rewards.len()
    }

    //fails on any empty dimension
    pub fn check(&self) -> Result<(), SweepError> {
        let dimensions = [
            ("lookback", self.lookbacks.len()),
            ("overbought", self.overboughts.len()),
            ("oversold", self.oversolds.len()),
            ("risk_reward", self.risk_rewards.len()),
        ];
        for (name, len) in dimensions {
            if len == 0 {
                return Err(SweepError::InvalidParameterRange {
                    name,
                    reason: "range is empty".to_string(),
                });
            }
        }
        Ok(())
    }

    //cartesian product in enumeration order: lookback, overbought, oversold, risk_reward
    //parameters not swept are taken from `base`
    pub fn combinations(&self, base: &RsiParams) -> Vec<RsiParams> {
        let mut combos = Vec::with_capacity(self.size());
        for &lookback in &self.lookbacks {
            for &overbought in &self.overboughts {
                for &oversold in &self.oversolds {
                    for &risk_reward in &self.risk_rewards {
                        combos.push(RsiParams {
                            lookback,
                            overbought,
                            oversold,
                            risk_reward,
                            ..*base
                        });
                    }
                }
            }
        }
        combos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> ParamGrid {
        ParamGrid {
            lookbacks: vec![10, 14],
            overboughts: vec![70.0],
            oversolds: vec![25.0, 30.0],
            risk_rewards: vec![1.0, 2.0, 3.0],
        }
    }

    #[test]
    fn size_is_product() {
        assert_eq!(grid().size(), 12);
        assert_eq!(grid().combinations(&RsiParams::default()).len(), 12);
    }

    #[test]
    fn enumeration_order_is_nested() {
        let base = RsiParams {
            risk_per_trade: 0.05,
            ..RsiParams::default()
        };
        let combos = grid().combinations(&base);
        assert_eq!(combos[0].lookback, 10);
        assert_eq!(combos[0].oversold, 25.0);
        assert_eq!(combos[0].risk_reward, 1.0);
        assert_eq!(combos[1].risk_reward, 2.0);
        assert_eq!(combos[3].oversold, 30.0);
        assert_eq!(combos[6].lookback, 14);
        assert!(combos.iter().all(|p| p.risk_per_trade == 0.05));
    }

    #[test]
    fn empty_dimension_fails_check() {
        let mut g = grid();
        g.risk_rewards.clear();
        assert_eq!(g.size(), 0);
        assert!(matches!(
            g.check(),
            Err(SweepError::InvalidParameterRange { name: "risk_reward", .. })
        ));
    }

    #[test]
    fn single_grid_holds_base() {
        let params = RsiParams::default();
        let combos = ParamGrid::single(&params).combinations(&params);
        assert_eq!(combos, vec![params]);
    }
}
