mod checkout;
mod expense;
mod money;
mod product;
mod sale;

pub use checkout::*;
pub use expense::*;
pub use money::*;
pub use product::*;
pub use sale::*;
