// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Segmentation manager
//!
//! Routes oversized outgoing SOME/IP messages to a per-flow segmentizer.
//! The segmentizers live in a fixed backing array sized at construction;
//! two singly linked lists threaded through the array by slot index track
//! free and maybe-busy slots. Invariant: every slot is on exactly one list.
//!
//! Reclamation is lazy: a segmentizer that drained its queue stays on the
//! maybe-busy list until the next walk notices it is idle and moves it back
//! to the free list.

use std::net::IpAddr;

use crate::config::SegmentationConfig;
use crate::segmentation::header::{SomeIpHeader, SOMEIP_HEADER_LEN};
use crate::segmentation::segmentizer::{SegmentationParams, Segmentizer, SegmentizerKey};
use crate::segmentation::timer::TimerService;

/// Result of routing one message through the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationOutcome {
    /// Segmentation started; the first burst went out.
    Ok,
    /// All segmentizer slots are busy with other flows.
    NoSegmentizerFound,
    /// The message or the parameters are unusable for segmentation.
    WrongSegmentationParameters,
}

/// Counters for the segmentation subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentationMetrics {
    /// Messages accepted for segmentation.
    pub messages_segmented: u64,
    /// Individual TP segments handed to the send callback.
    pub segments_sent: u64,
    /// Messages refused by parameter/message validation.
    pub rejected_parameters: u64,
    /// Messages refused because no slot was available.
    pub pool_exhausted: u64,
}

/// One backing-array entry: the segmentizer plus its list linkage.
struct Slot {
    segmentizer: Segmentizer,
    next: Option<usize>,
}

/// Fixed-capacity pool of per-flow segmentizers.
pub struct SegmentationManager {
    slots: Vec<Slot>,
    free_head: Option<usize>,
    busy_head: Option<usize>,
    timer: Box<dyn TimerService>,
    metrics: SegmentationMetrics,
}

impl SegmentationManager {
    /// Allocate the backing array once; nothing grows afterwards.
    pub fn new(config: &SegmentationConfig, timer: Box<dyn TimerService>) -> Self {
        let count = config.max_segmentizer_count;
        let mut slots = Vec::with_capacity(count);
        for i in 0..count {
            slots.push(Slot {
                segmentizer: Segmentizer::new(),
                next: if i + 1 < count { Some(i + 1) } else { None },
            });
        }
        Self {
            slots,
            free_head: if count > 0 { Some(0) } else { None },
            busy_head: None,
            timer,
            metrics: SegmentationMetrics::default(),
        }
    }

    /// Route one message: find or claim the flow's segmentizer and start the
    /// paced transmission through `send`.
    pub fn process_message(
        &mut self,
        address: IpAddr,
        port: u16,
        packet: &[u8],
        params: &SegmentationParams,
        send: &mut dyn FnMut(&[u8]),
    ) -> SegmentationOutcome {
        let Some(header) = SomeIpHeader::parse(packet) else {
            log::warn!("[SEGMENT] packet too short for a SOME/IP header");
            self.metrics.rejected_parameters += 1;
            return SegmentationOutcome::WrongSegmentationParameters;
        };
        let key = SegmentizerKey::new(address, port, &header);

        let Some(index) = self.find_or_claim(key) else {
            log::warn!(
                "[SEGMENT] no segmentizer available for {}:{} service {:#06x}",
                address,
                port,
                header.service_id
            );
            self.metrics.pool_exhausted += 1;
            return SegmentationOutcome::NoSegmentizerFound;
        };

        let payload = &packet[SOMEIP_HEADER_LEN..];
        let mut sent = 0usize;
        let accepted = {
            let mut counting_send = |frame: &[u8]| {
                sent += 1;
                send(frame);
            };
            self.slots[index].segmentizer.segment(
                &header,
                payload,
                params,
                index,
                self.timer.as_mut(),
                &mut counting_send,
            )
        };
        self.metrics.segments_sent += sent as u64;

        if accepted {
            self.metrics.messages_segmented += 1;
            SegmentationOutcome::Ok
        } else {
            self.metrics.rejected_parameters += 1;
            SegmentationOutcome::WrongSegmentationParameters
        }
    }

    /// Separation timer fired for `timer_id` (= slot index): transmit the
    /// next burst of that segmentizer.
    pub fn on_timer_expired(&mut self, timer_id: usize, send: &mut dyn FnMut(&[u8])) {
        if timer_id >= self.slots.len() {
            log::warn!("[SEGMENT] timer for unknown slot {}", timer_id);
            return;
        }
        let mut sent = 0usize;
        {
            let mut counting_send = |frame: &[u8]| {
                sent += 1;
                send(frame);
            };
            self.slots[timer_id].segmentizer.send_burst(
                timer_id,
                self.timer.as_mut(),
                &mut counting_send,
            );
        }
        self.metrics.segments_sent += sent as u64;
    }

    /// Walk the maybe-busy list, reclaiming idle slots on the way; fall back
    /// to the free list when the flow has no active segmentizer.
    fn find_or_claim(&mut self, key: SegmentizerKey) -> Option<usize> {
        let mut prev: Option<usize> = None;
        let mut cursor = self.busy_head;

        while let Some(index) = cursor {
            let next = self.slots[index].next;
            if !self.slots[index].segmentizer.is_busy() {
                // Idle since the last walk: unlink from busy, push to free.
                self.timer.cancel(index);
                self.slots[index].segmentizer.release();
                match prev {
                    Some(p) => self.slots[p].next = next,
                    None => self.busy_head = next,
                }
                self.slots[index].next = self.free_head;
                self.free_head = Some(index);
            } else if self.slots[index].segmentizer.key() == Some(&key) {
                return Some(index);
            } else {
                prev = Some(index);
            }
            cursor = next;
        }

        // No active segmentizer for this flow: claim a free slot.
        let index = self.free_head?;
        self.free_head = self.slots[index].next;
        self.slots[index].segmentizer.assign(key);
        self.slots[index].next = self.busy_head;
        self.busy_head = Some(index);
        Some(index)
    }

    pub fn metrics(&self) -> &SegmentationMetrics {
        &self.metrics
    }

    /// Slots currently on the free list (diagnostics).
    pub fn free_slots(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.free_head;
        while let Some(index) = cursor {
            count += 1;
            cursor = self.slots[index].next;
        }
        count
    }
}
