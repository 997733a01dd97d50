// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace helpers
//!
//! A namespace is `<database>.<collection>` where the collection part may
//! itself contain dots (`shop.orders.$_id_` is an index of `shop.orders`).

/// Database part of a namespace (everything before the first dot)
pub fn database_of(ns: &str) -> &str {
    match ns.find('.') {
        Some(idx) => &ns[..idx],
        None => ns,
    }
}

/// True if `child` is `parent` or lives under it (`parent.` prefix)
pub fn is_subcollection_of(parent: &str, child: &str) -> bool {
    match child.strip_prefix(parent) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}
