#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use vc_portable as portable;
pub use vc_stream as stream;
pub use vc_utils as utils;
