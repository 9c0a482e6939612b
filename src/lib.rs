//! OpenFlow control channel handling and wire codecs.
//!
//! `ds` holds the protocol structures (OXM lists, multi-version matches,
//! actions, buckets, group/flow mods, group statistics) and their
//! binary encoding. `ctl` holds the connection state machine that
//! negotiates a protocol version and keeps the channel alive, plus a
//! plain TCP driver for it.

// Lints triggered inside `enum-primitive-derive` expansions on newer rustc.
#![allow(overflowing_literals, ambiguous_associated_items)]

#[macro_use]
extern crate getset;

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;

#[macro_use]
extern crate enum_primitive_derive;
extern crate num_traits;
extern crate byteorder;
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate bitfield;

pub mod ctl;
pub mod ds;
pub mod err;
