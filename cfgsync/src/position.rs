use xmlapi_core::MoveWhere;

use crate::error::SyncError;

/// Where the managed block of an ordered collection should sit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    First,
    Last,
    /// Before `pivot`; immediately before it when `direct` is set.
    Before { pivot: String, direct: bool },
    /// After `pivot`; immediately after it when `direct` is set.
    After { pivot: String, direct: bool },
}

impl Placement {
    pub fn pivot(&self) -> Option<&str> {
        match self {
            Placement::First | Placement::Last => None,
            Placement::Before { pivot, .. } | Placement::After { pivot, .. } => Some(pivot.as_str()),
        }
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        match self.pivot() {
            Some("") => Err(SyncError::InvalidPosition("pivot name is empty".into())),
            _ => Ok(()),
        }
    }

    /// Move directive for the first entry of a group.
    pub(crate) fn move_where(&self) -> (MoveWhere, Option<&str>) {
        match self {
            Placement::First => (MoveWhere::Top, None),
            Placement::Last => (MoveWhere::Bottom, None),
            Placement::Before { pivot, .. } => (MoveWhere::Before, Some(pivot.as_str())),
            Placement::After { pivot, .. } => (MoveWhere::After, Some(pivot.as_str())),
        }
    }
}

/// Placement as it appears in resource schemas: one optional field per variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyPosition {
    pub first: Option<bool>,
    pub last: Option<bool>,
    pub directly_before: Option<String>,
    pub directly_after: Option<String>,
    pub somewhere_before: Option<String>,
    pub somewhere_after: Option<String>,
}

impl TryFrom<LegacyPosition> for Placement {
    type Error = SyncError;

    fn try_from(value: LegacyPosition) -> Result<Self, Self::Error> {
        let mut candidates = Vec::new();
        if value.first == Some(true) {
            candidates.push(Placement::First);
        }
        if value.last == Some(true) {
            candidates.push(Placement::Last);
        }
        let pivots = [
            (value.directly_before, true, true),
            (value.directly_after, false, true),
            (value.somewhere_before, true, false),
            (value.somewhere_after, false, false),
        ];
        for (pivot, before, direct) in pivots {
            let Some(pivot) = pivot else { continue };
            candidates.push(if before {
                Placement::Before { pivot, direct }
            } else {
                Placement::After { pivot, direct }
            });
        }

        if candidates.len() > 1 {
            return Err(SyncError::InvalidPosition(
                "more than one position variant is set".into(),
            ));
        }
        let placement = candidates
            .pop()
            .ok_or_else(|| SyncError::InvalidPosition("no position variant is set".into()))?;
        placement.validate()?;
        Ok(placement)
    }
}
