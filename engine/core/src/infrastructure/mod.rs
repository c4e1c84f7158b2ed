// Copyright (c) 2026 Atrium Systems, Inc.
// SPDX-License-Identifier: AGPL-3.0

pub mod reasoning_http;

pub use reasoning_http::HttpReasoningProvider;
