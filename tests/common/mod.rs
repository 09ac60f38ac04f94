//! Small prime fields shared by the integration tests.

#![allow(dead_code)]

// Each field lives in its own module because `#[derive(PrimeField)]` emits
// module-level constants (MODULUS, R, ...) that would otherwise collide.

mod mersenne31 {
    use ff::PrimeField;

    /// The Mersenne prime 2^31 - 1.
    #[derive(PrimeField)]
    #[PrimeFieldModulus = "2147483647"]
    #[PrimeFieldGenerator = "7"]
    #[PrimeFieldReprEndianness = "little"]
    pub struct Mersenne31([u64; 1]);
}

mod goldilocks {
    use ff::PrimeField;

    /// The Goldilocks prime 2^64 - 2^32 + 1.
    #[derive(PrimeField)]
    #[PrimeFieldModulus = "18446744069414584321"]
    #[PrimeFieldGenerator = "7"]
    #[PrimeFieldReprEndianness = "little"]
    pub struct Goldilocks([u64; 2]);
}

mod babybear {
    use ff::PrimeField;

    /// BabyBear, 15·2^27 + 1.
    #[derive(PrimeField)]
    #[PrimeFieldModulus = "2013265921"]
    #[PrimeFieldGenerator = "31"]
    #[PrimeFieldReprEndianness = "little"]
    pub struct BabyBear([u64; 1]);
}

pub use babybear::BabyBear;
pub use goldilocks::Goldilocks;
pub use mersenne31::Mersenne31;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
