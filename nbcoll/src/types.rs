use crate::error::CollectiveError;
use std::str::FromStr;

/// Global rank of a process (0-indexed, unique process-wide).
pub type Rank = u32;

/// Element types supported by the collectives.
///
/// This is the one canonical type descriptor. External spellings (`"int32"`,
/// `"f64"`, ...) are resolved once through [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DataType {
    Int = 0,
    Int16 = 1,
    Long = 2,
    Float = 3,
    Double = 4,
    Bool = 5,
}

impl DataType {
    /// Every supported element type, in declaration order.
    pub const ALL: [DataType; 6] = [
        DataType::Int,
        DataType::Int16,
        DataType::Long,
        DataType::Float,
        DataType::Double,
        DataType::Bool,
    ];

    /// Size of one element on the wire, in bytes.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DataType::Int | DataType::Float => 4,
            DataType::Long | DataType::Double => 8,
            DataType::Int16 => 2,
            DataType::Bool => 1,
        }
    }

    /// Canonical name.
    pub const fn name(self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Int16 => "int16",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Bool => "bool",
        }
    }

    /// `true` for the IEEE floating-point types.
    pub const fn is_float(self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    /// `true` for every type except `Bool`.
    pub const fn is_numeric(self) -> bool {
        !matches!(self, DataType::Bool)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = CollectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "int32" | "int32_t" | "i32" => Ok(DataType::Int),
            "int16" | "int16_t" | "i16" | "short" => Ok(DataType::Int16),
            "long" | "int64" | "int64_t" | "i64" => Ok(DataType::Long),
            "float" | "float32" | "f32" => Ok(DataType::Float),
            "double" | "float64" | "f64" => Ok(DataType::Double),
            "bool" | "boolean" => Ok(DataType::Bool),
            _ => Err(CollectiveError::UnknownDataType(s.to_string())),
        }
    }
}

/// Element-wise reduction operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Element-wise sum across ranks.
    Sum,
    /// Element-wise product across ranks.
    Prod,
    /// Element-wise minimum across ranks.
    Min,
    /// Element-wise maximum across ranks.
    Max,
    /// Logical and (boolean only).
    And,
    /// Logical or (boolean only).
    Or,
}

impl ReduceOp {
    /// Whether this operator is meaningful for `dtype`.
    ///
    /// Arithmetic and ordering operators apply to numeric types, logical
    /// operators to `Bool`.
    pub const fn supports(self, dtype: DataType) -> bool {
        match self {
            ReduceOp::Sum | ReduceOp::Prod | ReduceOp::Min | ReduceOp::Max => dtype.is_numeric(),
            ReduceOp::And | ReduceOp::Or => !dtype.is_numeric(),
        }
    }
}

impl std::fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceOp::Sum => f.write_str("sum"),
            ReduceOp::Prod => f.write_str("prod"),
            ReduceOp::Min => f.write_str("min"),
            ReduceOp::Max => f.write_str("max"),
            ReduceOp::And => f.write_str("and"),
            ReduceOp::Or => f.write_str("or"),
        }
    }
}

impl FromStr for ReduceOp {
    type Err = CollectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(ReduceOp::Sum),
            "prod" | "product" => Ok(ReduceOp::Prod),
            "min" => Ok(ReduceOp::Min),
            "max" => Ok(ReduceOp::Max),
            "and" => Ok(ReduceOp::And),
            "or" => Ok(ReduceOp::Or),
            _ => Err(CollectiveError::UnknownReduceOp(s.to_string())),
        }
    }
}

/// The communication pattern of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectiveKind {
    Broadcast,
    Allreduce,
    Allgatherv,
}

impl CollectiveKind {
    /// Name used in log lines and error messages.
    pub const fn name(self) -> &'static str {
        match self {
            CollectiveKind::Broadcast => "broadcast",
            CollectiveKind::Allreduce => "allreduce",
            CollectiveKind::Allgatherv => "allgatherv",
        }
    }
}

impl std::fmt::Display for CollectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Algorithm implementing a collective.
///
/// All algorithms of one collective produce the same logical result; they
/// differ in round count and per-rank bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Algorithm {
    /// Neighbor exchange around the group ring.
    Ring,
    /// Pairwise exchange at strides 1, 2, 4, ...
    RecursiveDoubling,
    /// Chain forwarding starting at the root.
    Linear,
    /// Root sends directly to every other member.
    SendToAll,
}

impl Algorithm {
    /// Canonical name.
    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Ring => "ring",
            Algorithm::RecursiveDoubling => "recursive_doubling",
            Algorithm::Linear => "linear",
            Algorithm::SendToAll => "send_to_all",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = CollectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "ring" => Ok(Algorithm::Ring),
            "recursivedoubling" => Ok(Algorithm::RecursiveDoubling),
            "linear" | "basiclinear" => Ok(Algorithm::Linear),
            "sendtoall" => Ok(Algorithm::SendToAll),
            _ => Err(CollectiveError::UnknownAlgorithmName(s.to_string())),
        }
    }
}
