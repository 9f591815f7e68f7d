pub const COLOR_MPT_YELLOW: &str = "#FFD100";
pub const COLOR_MPT_BLUE: &str = "#005BAA";
pub const COLOR_WHITE: &str = "#FFFFFF";
pub const COLOR_DARK_BLUE: &str = "#003d73";
pub const COLOR_LIGHT_BLUE: &str = "#337cbb";

pub const SLICES_KEY: &str = "mpt_spin_slices";
pub const HISTORY_KEY: &str = "mpt_spin_history";

pub const HISTORY_CAP: usize = 50;

// Reward thresholds for effects and stats
pub const CONFETTI_THRESHOLD: u64 = 250;
pub const BIG_REWARD_THRESHOLD: u64 = 3000;

pub const EMPTY_SLICES_ERROR: &str = "Add at least one reward before spinning";
pub const NO_WEIGHT_ERROR: &str = "At least one reward needs a chance above zero";
