/// Points awarded per rule hit, one weight per dimension.
///
/// Defaults give every dimension equal pull and make five single-hit
/// dimensions land exactly on the 100-point ceiling. Deployments can retune
/// a dimension through `HV_WEIGHT_*` without touching the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleWeights {
    pub skills: u32,
    pub languages: u32,
    pub experience: u32,
    pub duration: u32,
    pub interest: u32,
}

pub const DEFAULT_WEIGHTS: RuleWeights = RuleWeights {
    skills: 20,
    languages: 20,
    experience: 20,
    duration: 20,
    interest: 20,
};

impl RuleWeights {
    pub fn sum(&self) -> u32 {
        self.skills + self.languages + self.experience + self.duration + self.interest
    }

    /// Read once at startup; unset or unparsable variables keep the default.
    pub fn from_env() -> Self {
        Self {
            skills: env_weight("HV_WEIGHT_SKILLS", DEFAULT_WEIGHTS.skills),
            languages: env_weight("HV_WEIGHT_LANGUAGES", DEFAULT_WEIGHTS.languages),
            experience: env_weight("HV_WEIGHT_EXPERIENCE", DEFAULT_WEIGHTS.experience),
            duration: env_weight("HV_WEIGHT_DURATION", DEFAULT_WEIGHTS.duration),
            interest: env_weight("HV_WEIGHT_INTEREST", DEFAULT_WEIGHTS.interest),
        }
    }
}

impl Default for RuleWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

fn env_weight(var: &str, default: u32) -> u32 {
    std::env::var(var)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::scoring::MAX_SCORE;

    #[test]
    fn default_weights_fill_the_ceiling() {
        assert_eq!(DEFAULT_WEIGHTS.sum(), MAX_SCORE);
    }

    #[test]
    fn unset_variables_fall_back_to_defaults() {
        assert_eq!(env_weight("HV_WEIGHT_NO_SUCH_DIMENSION", 7), 7);
    }
}
