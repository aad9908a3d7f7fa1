pub mod assemble;
pub mod criteria;
pub mod literal;
pub mod sections;
pub mod session;

pub use assemble::{assemble, AssembledQuery, QueryAssembler};
pub use criteria::{Combinator, CompareOp, Comparison, Criteria, MatchMode};
pub use literal::{LiteralWriter, Quoting};
pub use sections::{Section, SectionPredicate};
pub use session::Session;
