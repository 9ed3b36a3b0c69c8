// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-flow segmentizer
//!
//! Splits one oversized SOME/IP message into TP segments and paces them out:
//! `burst_size` segments immediately, then the next burst every
//! `separation_time`, driven by the owner's timer service. A segmentizer is
//! busy while segments are pending and reports idle the moment its queue
//! drains; the manager reclaims idle slots lazily.

use std::collections::VecDeque;
use std::net::IpAddr;
use std::time::Duration;

use crate::segmentation::header::{
    encode_tp_header, SomeIpHeader, MESSAGE_TYPE_TP_FLAG, SOMEIP_LENGTH_COVERED, TP_HEADER_LEN,
    TP_OFFSET_UNIT,
};
use crate::segmentation::timer::TimerService;

/// Flow identity: one segmentizer serves one in-flight message of one flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentizerKey {
    pub address: IpAddr,
    pub port: u16,
    pub service_id: u16,
    pub method_id: u16,
    pub client_id: u16,
}

impl SegmentizerKey {
    pub fn new(address: IpAddr, port: u16, header: &SomeIpHeader) -> Self {
        Self {
            address,
            port,
            service_id: header.service_id,
            method_id: header.method_id,
            client_id: header.client_id,
        }
    }
}

/// Pacing and sizing parameters for one segmentation run.
#[derive(Debug, Clone)]
pub struct SegmentationParams {
    /// Delay between two segment bursts.
    pub separation_time: Duration,
    /// Payload bytes per segment; must be a positive multiple of 16 (the TP
    /// offset unit).
    pub max_segment_length: usize,
    /// Segments transmitted back-to-back before waiting.
    pub burst_size: usize,
}

/// Per-flow segmentation state backed by one pool slot.
#[derive(Debug, Default)]
pub struct Segmentizer {
    key: Option<SegmentizerKey>,
    pending: VecDeque<Vec<u8>>,
    separation_time: Duration,
    burst_size: usize,
}

impl Segmentizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segments still waiting for a burst slot.
    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn key(&self) -> Option<&SegmentizerKey> {
        self.key.as_ref()
    }

    pub(crate) fn assign(&mut self, key: SegmentizerKey) {
        self.key = Some(key);
    }

    /// Drop flow identity and any leftover segments (slot reclaimed).
    pub(crate) fn release(&mut self) {
        self.key = None;
        self.pending.clear();
    }

    /// Split `payload` into TP segments and transmit the first burst.
    ///
    /// Returns `false` (nothing sent) when the parameters or the message are
    /// unusable: misaligned segment length, zero burst, a message that is
    /// already TP, an inconsistent length field, a payload that fits in a
    /// single segment, or a previous message still being paced.
    pub fn segment(
        &mut self,
        header: &SomeIpHeader,
        payload: &[u8],
        params: &SegmentationParams,
        timer_id: usize,
        timer: &mut dyn TimerService,
        send: &mut dyn FnMut(&[u8]),
    ) -> bool {
        if params.max_segment_length == 0 || params.max_segment_length % TP_OFFSET_UNIT != 0 {
            log::warn!(
                "[SEGMENT] segment length {} not a positive multiple of {}",
                params.max_segment_length,
                TP_OFFSET_UNIT
            );
            return false;
        }
        if params.burst_size == 0 {
            log::warn!("[SEGMENT] burst size must be at least 1");
            return false;
        }
        if header.is_tp() {
            log::warn!("[SEGMENT] refusing to re-segment a TP message");
            return false;
        }
        if header.length as usize != SOMEIP_LENGTH_COVERED + payload.len() {
            log::warn!(
                "[SEGMENT] header length {} disagrees with payload of {} bytes",
                header.length,
                payload.len()
            );
            return false;
        }
        if payload.len() <= params.max_segment_length {
            log::warn!("[SEGMENT] message fits one segment; segmentation refused");
            return false;
        }
        if self.is_busy() {
            log::warn!("[SEGMENT] previous message still being paced on this flow");
            return false;
        }

        let mut offset = 0;
        while offset < payload.len() {
            let end = (offset + params.max_segment_length).min(payload.len());
            let chunk = &payload[offset..end];
            let more_segments = end < payload.len();

            let mut seg_header = *header;
            seg_header.message_type |= MESSAGE_TYPE_TP_FLAG;
            seg_header.length = (SOMEIP_LENGTH_COVERED + TP_HEADER_LEN + chunk.len()) as u32;

            let mut frame =
                Vec::with_capacity(seg_header.encode().len() + TP_HEADER_LEN + chunk.len());
            frame.extend_from_slice(&seg_header.encode());
            frame.extend_from_slice(&encode_tp_header(offset, more_segments));
            frame.extend_from_slice(chunk);
            self.pending.push_back(frame);

            offset = end;
        }

        self.separation_time = params.separation_time;
        self.burst_size = params.burst_size;
        log::debug!(
            "[SEGMENT] paced transmission of {} segments started",
            self.pending.len()
        );
        self.send_burst(timer_id, timer, send);
        true
    }

    /// Transmit up to one burst; re-arm the separation timer while segments
    /// remain. Returns the number of segments sent.
    pub(crate) fn send_burst(
        &mut self,
        timer_id: usize,
        timer: &mut dyn TimerService,
        send: &mut dyn FnMut(&[u8]),
    ) -> usize {
        let mut sent = 0;
        while sent < self.burst_size {
            let Some(frame) = self.pending.pop_front() else {
                break;
            };
            send(&frame);
            sent += 1;
        }
        if self.pending.is_empty() {
            timer.cancel(timer_id);
        } else {
            timer.start(timer_id, self.separation_time);
        }
        sent
    }
}
