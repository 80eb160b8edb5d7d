//! Symbolic context flags and their `GSS_C_*_FLAG` bits.
//!
//! Encoding is permissive: symbols that name no flag are skipped, never
//! reported. Decoding always yields flags in [`Flag::CANONICAL`] order.

use std::fmt::{Debug, Formatter};

pub const GSS_C_DELEG_FLAG: u32 = 1;
pub const GSS_C_MUTUAL_FLAG: u32 = 2;
pub const GSS_C_REPLAY_FLAG: u32 = 4;
pub const GSS_C_SEQUENCE_FLAG: u32 = 8;
pub const GSS_C_CONF_FLAG: u32 = 16;
pub const GSS_C_INTEG_FLAG: u32 = 32;
pub const GSS_C_ANON_FLAG: u32 = 64;
pub const GSS_C_PROT_READY_FLAG: u32 = 128;
pub const GSS_C_TRANS_FLAG: u32 = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flag {
    Deleg,
    Mutual,
    Replay,
    Sequence,
    Conf,
    Integ,
    Anon,
    ProtReady,
    Trans,
}
impl Flag {
    pub const CANONICAL: [Flag; 9] = [
        Flag::Deleg,
        Flag::Mutual,
        Flag::Replay,
        Flag::Sequence,
        Flag::Conf,
        Flag::Integ,
        Flag::Anon,
        Flag::ProtReady,
        Flag::Trans,
    ];
    /// The flags a caller may request. `prot-ready` and `trans` only ever come back.
    pub const REQUESTABLE: [Flag; 7] = [
        Flag::Deleg,
        Flag::Mutual,
        Flag::Replay,
        Flag::Sequence,
        Flag::Conf,
        Flag::Integ,
        Flag::Anon,
    ];

    pub const fn bit(self) -> u32 {
        match self {
            Flag::Deleg => GSS_C_DELEG_FLAG,
            Flag::Mutual => GSS_C_MUTUAL_FLAG,
            Flag::Replay => GSS_C_REPLAY_FLAG,
            Flag::Sequence => GSS_C_SEQUENCE_FLAG,
            Flag::Conf => GSS_C_CONF_FLAG,
            Flag::Integ => GSS_C_INTEG_FLAG,
            Flag::Anon => GSS_C_ANON_FLAG,
            Flag::ProtReady => GSS_C_PROT_READY_FLAG,
            Flag::Trans => GSS_C_TRANS_FLAG,
        }
    }
    pub const fn symbol(self) -> &'static str {
        match self {
            Flag::Deleg => "deleg",
            Flag::Mutual => "mutual",
            Flag::Replay => "replay",
            Flag::Sequence => "sequence",
            Flag::Conf => "conf",
            Flag::Integ => "integ",
            Flag::Anon => "anon",
            Flag::ProtReady => "prot-ready",
            Flag::Trans => "trans",
        }
    }
    /// Only the seven requestable flags are recognized on input, matching
    /// what a request can carry.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::REQUESTABLE.into_iter().find(|f| f.symbol() == symbol)
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlagSet(u32);
impl FlagSet {
    pub const EMPTY: FlagSet = FlagSet(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
    pub const fn bits(self) -> u32 {
        self.0
    }
    pub const fn contains(self, flag: Flag) -> bool {
        self.0 & flag.bit() != 0
    }
    #[must_use]
    pub const fn with(self, flag: Flag) -> Self {
        Self(self.0 | flag.bit())
    }
    #[must_use]
    pub const fn without(self, flag: Flag) -> Self {
        Self(self.0 & !flag.bit())
    }
    #[must_use]
    pub const fn intersection(self, other: FlagSet) -> Self {
        Self(self.0 & other.0)
    }
    /// ORs together the bits of every recognized symbol; anything else is ignored.
    pub fn encode<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        symbols
            .into_iter()
            .filter_map(|s| Flag::from_symbol(s.as_ref()))
            .fold(Self::EMPTY, FlagSet::with)
    }
    pub fn decode(self) -> Vec<Flag> {
        self.iter().collect()
    }
    pub fn iter(self) -> impl Iterator<Item = Flag> {
        Flag::CANONICAL.into_iter().filter(move |f| self.contains(*f))
    }
}
impl FromIterator<Flag> for FlagSet {
    fn from_iter<T: IntoIterator<Item = Flag>>(iter: T) -> Self {
        iter.into_iter().fold(Self::EMPTY, FlagSet::with)
    }
}
impl Debug for FlagSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter().map(Flag::symbol)).finish()
    }
}
