use models::schemas::team_room::TeamModeSchema;

const HOUR: i64 = 60 * 60;

/// How a mode derives its target difficulties.
#[derive(Debug, Clone, Copy)]
pub enum Targets {
    /// Absolute difficulties.
    Fixed(&'static [i32]),
    /// Offsets from the creator's rating.
    Relative(&'static [i32]),
}

#[derive(Debug, Clone, Copy)]
pub struct TeamMode {
    pub key: &'static str,
    pub name: &'static str,
    pub duration_seconds: i64,
    pub targets: Targets,
}

// Sorted by key.
pub const MODES: &[TeamMode] = &[
    TeamMode {
        key: "div3",
        name: "Div. 3",
        duration_seconds: 3 * HOUR,
        targets: Targets::Fixed(&[800, 800, 900, 1000, 1200, 1400, 1600, 1800, 2000]),
    },
    TeamMode {
        key: "div3-plus",
        name: "Div. 3 Plus",
        duration_seconds: 4 * HOUR,
        targets: Targets::Fixed(&[
            800, 800, 900, 900, 1000, 1100, 1100, 1200, 1300, 1400, 1500, 1600, 1800, 1900, 2100,
        ]),
    },
    TeamMode {
        key: "quick",
        name: "Quick Practice",
        duration_seconds: HOUR,
        targets: Targets::Relative(&[-200, -100, 0, 100, 200]),
    },
];

pub fn find_mode(key: &str) -> Option<&'static TeamMode> {
    MODES.iter().find(|mode| mode.key == key)
}

pub fn list_modes() -> Vec<TeamModeSchema> {
    MODES.iter().map(TeamMode::schema).collect()
}

impl TeamMode {
    pub fn problem_count(&self) -> usize {
        match self.targets {
            Targets::Fixed(list) | Targets::Relative(list) => list.len(),
        }
    }

    /// Target difficulties for a room created by a player rated `rating`.
    pub fn targets(&self, rating: i32) -> Vec<i32> {
        match self.targets {
            Targets::Fixed(list) => list.to_vec(),
            Targets::Relative(offsets) => offsets.iter().map(|o| (rating + o).max(0)).collect(),
        }
    }

    pub fn schema(&self) -> TeamModeSchema {
        TeamModeSchema {
            key: self.key.to_owned(),
            name: self.name.to_owned(),
            duration_seconds: self.duration_seconds,
            problem_count: self.problem_count(),
        }
    }
}
