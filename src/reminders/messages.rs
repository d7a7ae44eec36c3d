use super::types::{NotificationCategory, ReminderContext};

/// Display strings for one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedText {
    pub title: String,
    pub message: String,
    pub detail: String,
}

/// Per-category templates. Scan-derived and manual reminders share them.
pub struct MessageTemplates;

impl MessageTemplates {
    pub fn render(category: NotificationCategory, ctx: &ReminderContext) -> RenderedText {
        match category {
            NotificationCategory::AppointmentScheduled => RenderedText {
                title: "Cita programada".into(),
                message: format!(
                    "{} tiene una cita de {} el {} a las {}.",
                    ctx.patient_name,
                    ctx.consultation_type,
                    ctx.date.format("%d/%m/%Y"),
                    ctx.time,
                ),
                detail: Self::schedule_detail(ctx),
            },
            NotificationCategory::AppointmentToday => RenderedText {
                title: "Cita hoy".into(),
                message: format!(
                    "{} tiene una cita de {} hoy a las {}.",
                    ctx.patient_name, ctx.consultation_type, ctx.time,
                ),
                detail: Self::schedule_detail(ctx),
            },
            NotificationCategory::AppointmentImminent => RenderedText {
                title: "Cita próxima".into(),
                message: format!(
                    "La cita de {} con {} comienza a las {}.",
                    ctx.consultation_type, ctx.patient_name, ctx.time,
                ),
                detail: Self::schedule_detail(ctx),
            },
            NotificationCategory::AppointmentMissed => RenderedText {
                title: "Cita sin atender".into(),
                message: format!(
                    "La cita de {} de las {} sigue como Programada. \
                     Actualice su estado si ya fue atendida.",
                    ctx.patient_name, ctx.time,
                ),
                detail: Self::schedule_detail(ctx),
            },
            NotificationCategory::PaymentOverdue => {
                let (message, detail) = match &ctx.overdue {
                    Some(o) => (
                        format!(
                            "{} tiene el pago {} de {} vencido desde el {}.",
                            ctx.patient_name,
                            o.first_installment,
                            format_amount(o.first_amount),
                            o.first_due.format("%d/%m/%Y"),
                        ),
                        format!(
                            "{} pago(s) vencido(s), total adeudado {}.",
                            o.overdue_count,
                            format_amount(o.overdue_total),
                        ),
                    ),
                    None => (
                        format!("{} tiene pagos vencidos.", ctx.patient_name),
                        String::new(),
                    ),
                };
                RenderedText {
                    title: "Pago vencido".into(),
                    message,
                    detail,
                }
            }
        }
    }

    fn schedule_detail(ctx: &ReminderContext) -> String {
        match ctx.minutes_remaining {
            Some(m) if m > 0 => format!("Faltan {}.", remaining_label(m)),
            Some(m) if m < 0 => format!("Hace {}.", remaining_label(-m)),
            Some(_) => "Comienza ahora.".into(),
            None => format!("{} {}", ctx.date.format("%d/%m/%Y"), ctx.time),
        }
    }
}

/// `"45 min"`, `"2 h"`, `"1 h 30 min"`.
pub fn remaining_label(minutes: i64) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{m} min"),
        (h, 0) => format!("{h} h"),
        (h, m) => format!("{h} h {m} min"),
    }
}

pub fn format_amount(amount: f64) -> String {
    format!("${amount:.2}")
}
