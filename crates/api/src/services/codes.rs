//! Order code generation.

use orderflow_core::OrderCode;
use rand::Rng;

/// Source of candidate order codes.
///
/// Uniqueness is not the generator's job: the store rejects duplicates and
/// the lifecycle asks for another code.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> OrderCode;
}

/// Uniformly random code from the whole `AA0000000..ZZ9999999` space.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> OrderCode {
        OrderCode::from_index(rand::rng().random_range(0..OrderCode::SPACE))
    }
}
