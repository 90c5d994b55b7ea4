//! Status reconciliation: joins configured IKE/child SAs against runtime
//! state and fans the result out to metrics sinks and the re-initiator.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Runs one reconciliation pass and fans statuses out to receivers.
pub mod reconciler;
/// Re-initiates configured child SAs with no runtime state, single-flight.
pub mod reinitiator;
/// Reconciled status types and the `StatusReceiver` fan-out trait.
pub mod status;
