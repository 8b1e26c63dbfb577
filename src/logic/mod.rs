mod padding;
mod piv_object;

pub use padding::pkcs1v15_signature_block;
pub use piv_object::certificate_der;
