pub mod inspect;
pub mod restore;
pub mod simulate;
pub mod util;
