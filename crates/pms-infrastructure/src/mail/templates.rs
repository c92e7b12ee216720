// ============================================================================
// PMS Infrastructure - Email Templates
// File: crates/pms-infrastructure/src/mail/templates.rs
// ============================================================================

use pms_core::notification::Template;

pub(crate) const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="id">
<head><meta charset="utf-8"><title>{{subject}}</title></head>
<body style="font-family: Arial, sans-serif; color: #222; background: #f5f5f5; padding: 24px;">
  <div style="max-width: 600px; margin: 0 auto; background: #fff; padding: 24px; border-radius: 6px;">
    <h2 style="margin-top: 0;">{{appName}}</h2>
    {{{body}}}
    <hr style="border: none; border-top: 1px solid #eee; margin: 24px 0;">
    <p style="font-size: 12px; color: #888;">
      Email ini dikirim otomatis oleh {{appName}}. Kelola preferensi notifikasi di
      <a href="{{frontendUrl}}/profile">{{frontendUrl}}/profile</a>.
    </p>
  </div>
</body>
</html>"#;

pub(crate) fn body(template: Template) -> &'static str {
    match template {
        Template::Welcome => {
            r#"<p>Halo {{name}},</p>
<p>Selamat datang di {{tenant}}. Akun Anda sudah aktif dan siap digunakan.</p>
<p><a href="{{frontendUrl}}/login">Masuk sekarang</a></p>"#
        }
        Template::VerifyEmail => {
            r#"<p>Halo {{name}},</p>
<p>Silakan verifikasi alamat email Anda dengan membuka tautan berikut:</p>
<p><a href="{{link}}">{{link}}</a></p>
<p>Tautan berlaku selama 24 jam.</p>"#
        }
        Template::PasswordReset => {
            r#"<p>Halo {{name}},</p>
<p>Kami menerima permintaan reset password untuk akun Anda.</p>
<p><a href="{{link}}">Reset password</a></p>
<p>Tautan berlaku selama 1 jam. Abaikan email ini jika Anda tidak memintanya.</p>"#
        }
        Template::PasswordChanged => {
            r#"<p>Halo {{name}},</p>
<p>Password akun Anda baru saja diubah. Hubungi pengelola jika ini bukan Anda.</p>"#
        }
        Template::TenantOnboarded => {
            r#"<p>Halo {{name}},</p>
<p>Tenant <strong>{{tenant}}</strong> (kode <code>{{code}}</code>) berhasil dibuat.
Anda terdaftar sebagai administrator.</p>
<p><a href="{{frontendUrl}}/login">Masuk ke dashboard</a></p>"#
        }
        Template::SubscriptionUpdated => {
            r#"<p>Halo {{name}},</p>
<p>Langganan {{tenant}} diperbarui: paket <strong>{{plan}}</strong>, status <strong>{{status}}</strong>.</p>"#
        }
        Template::PropertyCreated => {
            r#"<p>Halo {{name}},</p>
<p>Properti baru <strong>{{property}}</strong> telah ditambahkan{{#if city}} di {{city}}{{/if}}.</p>"#
        }
        Template::AnnouncementPublished => {
            r#"<p>Halo {{name}},</p>
<h3>{{title}}</h3>
<p>{{content}}</p>
<p>Prioritas: {{priority}}</p>"#
        }
        Template::ComplaintCreated => {
            r#"<p>Halo {{name}},</p>
<p>Keluhan baru <strong>{{title}}</strong> ({{category}}, prioritas {{priority}}) diajukan oleh {{resident}}.</p>"#
        }
        Template::ComplaintStatusChanged => {
            r#"<p>Halo {{name}},</p>
<p>Status keluhan <strong>{{title}}</strong> sekarang <strong>{{status}}</strong>.</p>
{{#if notes}}<p>Catatan: {{notes}}</p>{{/if}}"#
        }
        Template::ComplaintCommentAdded => {
            r#"<p>Halo {{name}},</p>
<p>{{author}} menambahkan komentar pada keluhan <strong>{{title}}</strong>:</p>
<blockquote>{{comment}}</blockquote>"#
        }
        Template::PaymentCreated => {
            r#"<p>Halo {{name}},</p>
<p>Tagihan {{type}} sebesar <strong>{{currency}} {{amount}}</strong> telah dibuat.</p>
<p>Jatuh tempo: {{dueDate}}</p>"#
        }
        Template::PaymentStatusChanged => {
            r#"<p>Halo {{name}},</p>
<p>Status pembayaran sebesar {{currency}} {{amount}} sekarang <strong>{{status}}</strong>.</p>"#
        }
        Template::MaintenanceScheduled => {
            r#"<p>Halo {{name}},</p>
<p>Pemeliharaan <strong>{{title}}</strong> dijadwalkan mulai {{startDate}}{{#if endDate}} sampai {{endDate}}{{/if}}.</p>"#
        }
        Template::MaintenanceAssigned => {
            r#"<p>Halo {{name}},</p>
<p>Anda ditugaskan menangani pemeliharaan <strong>{{title}}</strong> (prioritas {{priority}}), mulai {{startDate}}.</p>"#
        }
        Template::MaintenanceStatusChanged => {
            r#"<p>Halo {{name}},</p>
<p>Status pemeliharaan <strong>{{title}}</strong> sekarang <strong>{{status}}</strong>.</p>"#
        }
        Template::AccountDeactivated => {
            r#"<p>Halo {{name}},</p>
<p>Akun Anda telah dinonaktifkan oleh administrator. Hubungi pengelola untuk informasi lebih lanjut.</p>"#
        }
        Template::RecordRemoved => {
            r#"<p>Halo {{name}},</p>
<p>{{entity}} <strong>{{title}}</strong> telah dihapus oleh {{removedBy}}.</p>"#
        }
    }
}
