#![forbid(unsafe_code)]

//! Observable containers.
//!
//! Both containers broadcast one "updated" per content-changing call and
//! forward "updated" from any stored value that reports the observable
//! capability through [`AsObservable`](crate::AsObservable).

pub mod cursor;
pub mod dictionary;
pub mod hash_set;

pub use cursor::Cursor;
pub use dictionary::ObservableDictionary;
pub use hash_set::ObservableHashSet;
