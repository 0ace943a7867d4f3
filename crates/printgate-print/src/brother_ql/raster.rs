// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Brother QL raster command stream.
//
// One stream holds every page of a job:
//
//   200 x NUL                  invalidate
//   ESC @                      initialize
//   ESC i a 01                 switch to raster mode
//   per page:
//     ESC i S                  status request
//     ESC i z ...              print information (media, quality, rows)
//     ESC i M 40               auto cut
//     ESC i A 01               cut every label
//     ESC i K 08               cut at end
//     ESC i d nn nn            feed margin
//     M 00                     uncompressed rows
//     g 00 len data            one per raster line
//     FF or SUB                next page, or print and end

use printgate_core::error::{PrintgateError, Result};
use printgate_document::MonoBitmap;

use super::labels::{Label, Model};

const ESC: u8 = 0x1B;
const INVALIDATE_LEN: usize = 200;
const PRINT: u8 = 0x0C;
const PRINT_LAST: u8 = 0x1A;

const VALID_MEDIA_TYPE: u8 = 0x02;
const VALID_MEDIA_WIDTH: u8 = 0x04;
const VALID_MEDIA_LENGTH: u8 = 0x08;
const PRIORITY_QUALITY: u8 = 0x40;
const RECOVERY: u8 = 0x80;

/// Encode `pages` for `label` on `model`.
///
/// Every page must have exactly the label's printable size.
pub fn encode(pages: &[MonoBitmap], label: &Label, model: &Model) -> Result<Vec<u8>> {
    if pages.is_empty() {
        return Err(PrintgateError::Conversion("nothing to print".into()));
    }
    let (label_w, label_h) = label.dots_printable;
    if let Some(page) = pages.iter().find(|p| (p.width(), p.height()) != (label_w, label_h)) {
        return Err(PrintgateError::Conversion(format!(
            "page is {}x{} dots, label {} needs {label_w}x{label_h}",
            page.width(),
            page.height(),
            label.name
        )));
    }

    let row_len = model.bytes_per_row;
    let mut out = Vec::with_capacity(INVALIDATE_LEN + pages.len() * label_h as usize * (row_len + 3) + 64);
    out.extend(std::iter::repeat_n(0u8, INVALIDATE_LEN));
    out.extend_from_slice(&[ESC, b'@']);
    out.extend_from_slice(&[ESC, b'i', b'a', 0x01]);

    let right_margin = label.offset_right + model.additional_offset_right;
    for (index, page) in pages.iter().enumerate() {
        out.extend_from_slice(&[ESC, b'i', b'S']);
        print_information(&mut out, label, label_h, index);
        out.extend_from_slice(&[ESC, b'i', b'M', 0x40]);
        out.extend_from_slice(&[ESC, b'i', b'A', 0x01]);
        out.extend_from_slice(&[ESC, b'i', b'K', 0x08]);
        out.extend_from_slice(&[ESC, b'i', b'd']);
        out.extend_from_slice(&label.feed_margin.to_le_bytes());
        out.extend_from_slice(&[b'M', 0x00]);

        let mut row = vec![0u8; row_len];
        for y in 0..label_h {
            device_row(page, y, right_margin, &mut row);
            out.extend_from_slice(&[b'g', 0x00, row_len as u8]);
            out.extend_from_slice(&row);
        }
        out.push(if index + 1 == pages.len() { PRINT_LAST } else { PRINT });
    }
    Ok(out)
}

fn print_information(out: &mut Vec<u8>, label: &Label, rows: u32, page_index: usize) {
    let flags = RECOVERY | VALID_MEDIA_TYPE | VALID_MEDIA_WIDTH | VALID_MEDIA_LENGTH | PRIORITY_QUALITY;
    out.extend_from_slice(&[ESC, b'i', b'z', flags]);
    out.push(label.form_factor.media_type());
    out.push(label.tape_mm.0);
    out.push(label.tape_mm.1);
    out.extend_from_slice(&rows.to_le_bytes());
    out.push(if page_index == 0 { 0 } else { 1 });
    out.push(0);
}

/// Fill one head line. The head prints mirrored, so device dot `d` shows
/// label column `label_w + right_margin - 1 - d`.
fn device_row(page: &MonoBitmap, y: u32, right_margin: u32, row: &mut [u8]) {
    row.fill(0);
    let edge = i64::from(page.width()) + i64::from(right_margin) - 1;
    for d in 0..row.len() * 8 {
        let x = edge - d as i64;
        if x < 0 || x >= i64::from(page.width()) {
            continue;
        }
        if page.get(x as u32, y) {
            row[d / 8] |= 0x80 >> (d % 8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brother_ql::labels::{LABELS, find_model};

    fn wide() -> (&'static Label, &'static Model) {
        (&LABELS[0], find_model("QL-1050").unwrap())
    }

    fn blank() -> MonoBitmap {
        MonoBitmap::new(1164, 1660)
    }

    /// Offset of the first raster line command of the first page.
    fn first_row_offset() -> usize {
        // invalidate, init, mode, status, print info, cut, every, expanded,
        // margin, compression
        INVALIDATE_LEN + 2 + 4 + 3 + 13 + 4 + 4 + 4 + 5 + 2
    }

    #[test]
    fn stream_starts_with_invalidate_and_init() {
        let (label, model) = wide();
        let out = encode(&[blank()], label, model).unwrap();
        assert!(out[..INVALIDATE_LEN].iter().all(|&b| b == 0));
        assert_eq!(&out[INVALIDATE_LEN..INVALIDATE_LEN + 6], &[ESC, b'@', ESC, b'i', b'a', 0x01]);
        assert_eq!(*out.last().unwrap(), PRINT_LAST);
    }

    #[test]
    fn print_information_describes_die_cut_label() {
        let (label, model) = wide();
        let out = encode(&[blank()], label, model).unwrap();
        let start = INVALIDATE_LEN + 6 + 3;
        assert_eq!(
            &out[start..start + 13],
            &[ESC, b'i', b'z', 0xCE, 0x0B, 104, 164, 0x7C, 0x06, 0x00, 0x00, 0x00, 0x00][..]
        );
    }

    #[test]
    fn every_row_has_full_head_width() {
        let (label, model) = wide();
        let out = encode(&[blank()], label, model).unwrap();
        let rows_len = 1660 * (3 + 162);
        assert_eq!(out.len(), first_row_offset() + rows_len + 1);
        let first = first_row_offset();
        assert_eq!(&out[first..first + 3], &[b'g', 0x00, 162]);
    }

    #[test]
    fn left_label_column_lands_on_high_head_dot() {
        let (label, model) = wide();
        let mut page = blank();
        page.set(0, 0, true);
        let out = encode(&[page], label, model).unwrap();
        let data = &out[first_row_offset() + 3..first_row_offset() + 3 + 162];
        // x = 0 maps to d = 1164 + 56 - 1 = 1219.
        let d = 1219;
        assert_eq!(data[d / 8], 0x80 >> (d % 8));
        assert_eq!(data.iter().map(|b| b.count_ones()).sum::<u32>(), 1);
    }

    #[test]
    fn right_label_column_sits_after_margin() {
        let (label, model) = wide();
        let mut page = blank();
        page.set(1163, 0, true);
        let out = encode(&[page], label, model).unwrap();
        let data = &out[first_row_offset() + 3..first_row_offset() + 3 + 162];
        assert_eq!(data[56 / 8], 0x80 >> (56 % 8));
    }

    #[test]
    fn pages_are_separated_by_form_feed() {
        let (label, model) = wide();
        let out = encode(&[blank(), blank()], label, model).unwrap();
        let page_len = 3 + 13 + 4 + 4 + 4 + 5 + 2 + 1660 * 165 + 1;
        let first_end = INVALIDATE_LEN + 6 + page_len - 1;
        assert_eq!(out[first_end], PRINT);
        assert_eq!(*out.last().unwrap(), PRINT_LAST);
        // second page flags itself as a continuation
        let info = first_end + 1 + 3;
        assert_eq!(out[info + 11], 1);
    }

    #[test]
    fn wrong_page_size_is_rejected() {
        let (label, model) = wide();
        let err = encode(&[MonoBitmap::new(10, 10)], label, model).unwrap_err();
        assert!(matches!(err, PrintgateError::Conversion(_)));
        assert!(encode(&[], label, model).is_err());
    }
}
