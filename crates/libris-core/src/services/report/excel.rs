//! Excel export for circulation reports

use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};

use super::{DashboardSummary, MonthlyReport, MonthlyStat};
use crate::dates::format_raw_date;
use crate::error::Result;
use crate::models::BorrowRecord;

/// Builds the report workbook sheet by sheet
pub struct ReportWorkbook {
    workbook: Workbook,
    header_format: Format,
    total_format: Format,
    cell_format: Format,
    money_format: Format,
}

impl ReportWorkbook {
    pub fn new() -> Self {
        // Header style: blue background, white bold text
        let header_format = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(0x4472C4))
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin);

        let total_format = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0xFFC000))
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin);

        let cell_format = Format::new()
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin);

        let money_format = Format::new()
            .set_num_format("0.00")
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin);

        Self {
            workbook: Workbook::new(),
            header_format,
            total_format,
            cell_format,
            money_format,
        }
    }

    /// Twelve months plus a totals row
    pub fn add_monthly_sheet(&mut self, report: &MonthlyReport) -> Result<()> {
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(format!("Monthly {}", report.year))?;

        let title_format = Format::new().set_bold().set_font_size(16);
        worksheet.merge_range(
            0,
            0,
            0,
            4,
            &format!("Circulation Report {}", report.year),
            &title_format,
        )?;

        let start_row = 2;
        let headers = ["Month", "Processed", "Borrowed", "Returned", "Overdue"];
        for (col, header) in headers.iter().enumerate() {
            worksheet.write_with_format(start_row, col as u16, *header, &self.header_format)?;
        }

        let write_stat = |ws: &mut rust_xlsxwriter::Worksheet,
                          row: u32,
                          stat: &MonthlyStat,
                          format: &Format|
         -> Result<()> {
            ws.write_with_format(row, 0, &stat.label, format)?;
            ws.write_with_format(row, 1, stat.processed as u32, format)?;
            ws.write_with_format(row, 2, stat.borrowed as u32, format)?;
            ws.write_with_format(row, 3, stat.returned as u32, format)?;
            ws.write_with_format(row, 4, stat.overdue as u32, format)?;
            Ok(())
        };

        for (idx, stat) in report.months.iter().enumerate() {
            write_stat(&mut *worksheet, start_row + 1 + idx as u32, stat, &self.cell_format)?;
        }
        let total_row = start_row + 1 + report.months.len() as u32;
        write_stat(&mut *worksheet, total_row, &report.totals, &self.total_format)?;

        worksheet.set_column_width(0, 12)?;
        for col in 1..5 {
            worksheet.set_column_width(col, 12)?;
        }
        Ok(())
    }

    /// One row per loan
    pub fn add_loans_sheet(&mut self, title: &str, loans: &[&BorrowRecord]) -> Result<()> {
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(title)?;

        let headers = [
            "ID", "Student", "Book", "Borrowed", "Due", "Returned", "Renewals", "Paid", "OR No.",
        ];
        for (col, header) in headers.iter().enumerate() {
            worksheet.write_with_format(0, col as u16, *header, &self.header_format)?;
        }

        for (idx, loan) in loans.iter().enumerate() {
            let row = 1 + idx as u32;
            let student = loan
                .student_name
                .clone()
                .unwrap_or_else(|| loan.student_id.to_string());
            let book = loan
                .book_title
                .clone()
                .unwrap_or_else(|| loan.book_id.to_string());

            worksheet.write_with_format(row, 0, loan.id as f64, &self.cell_format)?;
            worksheet.write(row, 1, student)?;
            worksheet.write(row, 2, book)?;
            worksheet.write_with_format(row, 3, format_raw_date(Some(&loan.borrowed_date)), &self.cell_format)?;
            worksheet.write_with_format(row, 4, format_raw_date(Some(&loan.due_date)), &self.cell_format)?;
            worksheet.write_with_format(row, 5, format_raw_date(loan.returned_date.as_deref()), &self.cell_format)?;
            worksheet.write_with_format(row, 6, loan.renewed_count, &self.cell_format)?;
            worksheet.write_with_format(row, 7, if loan.paid { "Yes" } else { "No" }, &self.cell_format)?;
            worksheet.write(row, 8, loan.or_number.as_deref().unwrap_or(""))?;
        }

        worksheet.set_column_width(0, 8)?;
        worksheet.set_column_width(1, 28)?;
        worksheet.set_column_width(2, 40)?;
        for col in 3..6 {
            worksheet.set_column_width(col, 14)?;
        }
        worksheet.set_column_width(8, 14)?;
        Ok(())
    }

    pub fn add_summary_sheet(&mut self, summary: &DashboardSummary) -> Result<()> {
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name("Summary")?;

        let label_format = Format::new().set_bold();
        let counts = [
            ("Total books", summary.total_books),
            ("Active loans", summary.active_loans),
            ("Overdue loans", summary.overdue_loans),
        ];
        for (idx, (label, value)) in counts.iter().enumerate() {
            worksheet.write_with_format(idx as u32, 0, *label, &label_format)?;
            worksheet.write_with_format(idx as u32, 1, *value as u32, &self.cell_format)?;
        }
        let fines_row = counts.len() as u32;
        worksheet.write_with_format(fines_row, 0, "Outstanding fines", &label_format)?;
        worksheet.write_with_format(fines_row, 1, summary.outstanding_fines, &self.money_format)?;

        let start_row = fines_row + 2;
        worksheet.write_with_format(start_row, 0, "Status", &self.header_format)?;
        worksheet.write_with_format(start_row, 1, "Books", &self.header_format)?;
        for (idx, entry) in summary.books_by_status.iter().enumerate() {
            let row = start_row + 1 + idx as u32;
            worksheet.write_with_format(row, 0, entry.status.as_str(), &self.cell_format)?;
            worksheet.write_with_format(row, 1, entry.count as u32, &self.cell_format)?;
        }

        worksheet.set_column_width(0, 20)?;
        worksheet.set_column_width(1, 12)?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(mut self, path: P) -> Result<()> {
        self.workbook.save(path)?;
        Ok(())
    }

    pub fn save_to_buffer(mut self) -> Result<Vec<u8>> {
        Ok(self.workbook.save_to_buffer()?)
    }
}

impl Default for ReportWorkbook {
    fn default() -> Self {
        Self::new()
    }
}
