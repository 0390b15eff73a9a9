#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use tb_codec as codec;
pub use tb_utils as utils;
