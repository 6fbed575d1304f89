use polytone_domain_tuning::{parse_bank_file, OctaveTuning};
use polytone_ports::tuning::{RawTuningBank, TuningError, TuningSource};

pub const EQUAL_TEMPERAMENT: &str = "equal temperament";

#[derive(Clone, Debug, PartialEq)]
pub struct TuningBank {
    pub name: String,
    pub tuning: OctaveTuning,
}

/// Validated MTS tuning banks, sorted by name.
///
/// Banks are addressed 1-based; index 0 stands for equal temperament.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MtsTuningStore {
    banks: Vec<TuningBank>,
}

impl MtsTuningStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(source: &dyn TuningSource) -> Result<Self, TuningError> {
        Ok(Self::from_raw(source.load_banks()?))
    }

    /// Keeps every bank that decodes as a framed octave tuning; the rest are
    /// skipped with a warning.
    pub fn from_raw(raw: Vec<RawTuningBank>) -> Self {
        let mut banks: Vec<TuningBank> = raw
            .into_iter()
            .filter_map(|bank| match parse_bank_file(&bank.data) {
                Ok(tuning) => Some(TuningBank {
                    name: bank.name,
                    tuning,
                }),
                Err(e) => {
                    log::warn!("skipping tuning bank {}: {e}", bank.name);
                    None
                }
            })
            .collect();
        banks.sort_by(|a, b| a.name.cmp(&b.name));
        log::debug!("loaded {} tuning banks", banks.len());
        Self { banks }
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    /// Bank at a 1-based index. Index 0 and indices past the end yield `None`.
    pub fn bank(&self, index: usize) -> Option<&TuningBank> {
        index.checked_sub(1).and_then(|i| self.banks.get(i))
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        if index == 0 {
            return Some(EQUAL_TEMPERAMENT);
        }
        self.bank(index).map(|b| b.name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.banks.iter().map(|b| b.name.as_str())
    }
}
