// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.

fn main() {
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/wire.proto"], &["proto"])
        .unwrap_or_else(|e| panic!("failed to compile proto/wire.proto: {e}"));

    println!("cargo:rerun-if-changed=proto/wire.proto");
}
